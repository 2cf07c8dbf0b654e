//! Extraction error re-export
//!
//! This module re-exports the field extraction error types.

pub use crate::infrastructure::parsing_error::{ExtractionError, ExtractionResult};

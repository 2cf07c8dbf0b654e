//! Detail-page parsing for the eFD portal
//!
//! Selector configuration and the field extractor that turns one raw
//! transaction row into a record draft.

pub mod config;
pub mod error;
pub mod field_extractor;

// Re-export public types
pub use config::PortalSelectors;
pub use error::{ExtractionError, ExtractionResult};
pub use field_extractor::{FieldExtractor, MIN_CELLS, PLACEHOLDER};

//! Field extraction error types
//!
//! Errors raised while turning one detail-page row into a record draft.
//! Each variant carries enough context to locate the offending row in logs.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Row has {found} cells, expected at least {expected}")]
    TooFewCells { found: usize, expected: usize },

    #[error("Filer label has no parenthesized filer name: '{label}'")]
    FilerLabel { label: String },

    #[error("Malformed transaction date '{raw}': {reason}")]
    Date { raw: String, reason: String },

    #[error("Required field '{field}' is empty")]
    EmptyField { field: &'static str },
}

impl ExtractionError {
    pub fn too_few_cells(found: usize, expected: usize) -> Self {
        Self::TooFewCells { found, expected }
    }

    pub fn filer_label(label: &str) -> Self {
        Self::FilerLabel {
            label: label.to_string(),
        }
    }

    pub fn date(raw: &str, reason: impl Into<String>) -> Self {
        Self::Date {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    pub const fn empty_field(field: &'static str) -> Self {
        Self::EmptyField { field }
    }

    /// Name of the record field the error is about
    pub const fn field(&self) -> &'static str {
        match self {
            Self::TooFewCells { .. } => "cells",
            Self::FilerLabel { .. } => "filer",
            Self::Date { .. } => "date",
            Self::EmptyField { field } => *field,
        }
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

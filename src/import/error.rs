// src/import/error.rs
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The CSV as a whole is unusable. Nothing was persisted.
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// One data row that was skipped. Collected in the import outcome; the rest of
/// the file is still imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based line number in the source text.
    pub row: usize,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

//! Error taxonomy shared by the parser, the mapping session and the stores.
//!
//! Library code returns [`MapperError`] so callers can tell a bad upload from
//! a storage failure; command handlers wrap it in `anyhow` with context.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MapperError>;

/// Kind of persisted record a lookup or delete referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Template,
    Mapping,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Template => f.write_str("template"),
            RecordKind::Mapping => f.write_str("mapping"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MapperError {
    /// No file chosen, or the file failed a size/name pre-check.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file type for '{name}' (expected .csv, .xlsx or .xls)")]
    UnsupportedFormat { name: String },

    #[error("Failed to parse '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Missing required mappings: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },

    #[error("Storage rejected the request: {0}")]
    Persistence(String),

    #[error("Cannot {action} while the session is {state}")]
    OutOfOrder { action: &'static str, state: String },
}

impl MapperError {
    pub(crate) fn parse<E>(name: &str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        MapperError::Parse {
            name: name.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        MapperError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MapperError::NotFound { .. })
    }
}

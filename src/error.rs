//! Error types for doc-entities.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. The relation extractor never surfaces these; it
//! degrades instead. The resolver only surfaces session-level storage faults.

use thiserror::Error;

use crate::mention::MentionId;
use crate::storage::StorageError;

/// Validation errors raised while constructing domain values.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange {
        value: f32,
    },

    #[error("Invalid span: start ({start}) is after end ({end})")]
    InvertedSpan {
        start: usize,
        end: usize,
    },

    #[error("Entity label cannot be empty")]
    EmptyLabel,

    #[error("Entity value cannot be empty")]
    EmptyValue,

    #[error("Unknown resolve mode '{value}' (expected 'sync' or 'async')")]
    UnknownMode {
        value: String,
    },

    #[error("Token {token} has head {head}, but the document only has {len} tokens")]
    DanglingHead {
        token: usize,
        head: usize,
        len: usize,
    },
}

/// Configuration errors raised while reading settings.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors raised by an injected dependency parser.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parser backend failed: {message}")]
    Backend {
        message: String,
    },

    #[error("Parser produced an invalid document: {0}")]
    InvalidDocument(#[from] ValidationError),
}

/// Why one entity in a resolve batch produced no resolution.
///
/// Faults are collected per entity and never abort the batch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveFault {
    #[error("Invalid entity id '{raw}': {reason}")]
    InvalidId {
        raw: String,
        reason: String,
    },

    #[error("Entity not found: {entity_id}")]
    Missing {
        entity_id: MentionId,
    },

    #[error("Resolution of {entity_id} failed: {message}")]
    Failed {
        entity_id: MentionId,
        message: String,
    },
}

impl ResolveFault {
    /// Outcome label used for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidId { .. } => "invalid_id",
            Self::Missing { .. } => "missing",
            Self::Failed { .. } => "error",
        }
    }
}

/// Top-level error type for doc-entities.
#[derive(Debug, Error)]
pub enum DocEntitiesError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocEntitiesError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type alias for doc-entities operations.
pub type Result<T> = std::result::Result<T, DocEntitiesError>;

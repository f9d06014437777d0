//! Catalog validation errors.

use thiserror::Error;

/// Errors raised while decoding or validating catalog records.
///
/// Persisted records are never trusted: both the local mirror and the remote
/// store hand back loosely-typed JSON, and anything that does not decode
/// into a well-formed entity ends up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Record could not be decoded into the entity shape.
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// Expected a sequence of records.
    #[error("Expected a sequence of records, got {0}")]
    NotASequence(&'static str),

    /// A required text field is empty.
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// A price is below zero.
    #[error("Field '{field}' must not be negative (got {value})")]
    NegativePrice { field: &'static str, value: String },

    /// Deal discount outside 0..=100.
    #[error("Discount {0}% is outside 0-100")]
    DiscountOutOfRange(u32),

    /// Two records in one batch share an id.
    #[error("Duplicate id '{0}'")]
    DuplicateId(String),

    /// One item in a batch failed.
    #[error("Item {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Malformed(e.to_string())
    }
}

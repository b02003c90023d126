//! Error types for Table batch operations.
//!
//! This module defines every error the codec can surface while serializing a
//! batch, parsing a batch response, or rehydrating entities.
//! The [`Result`] type alias provides a convenient shorthand for operations that may fail.
//!
//! # Error Categories
//!
//! | Category | Variants | Retryable |
//! |----------|----------|-----------|
//! | Encoding | `PropertyFormat` | No |
//! | Policy | `EncryptionPolicyViolation`, `Encryption` | No |
//! | Batch conflict | `BatchOperationFailed { retryable: false }` | No |
//! | Batch unexpected | `BatchOperationFailed { retryable: true }` | Yes |
//! | Transport / format | `MalformedResponse`, `Io`, `Transport` | Yes |
//! | Caller contract | `EmptyBatch`, `InvalidOperation` | No |
//!
//! The codec never retries on its own. [`TableError::is_retryable`] only reports
//! the classification so the executor wrapping the codec can decide.
//!
//! # Examples
//!
//! ```
//! use table_batch_rs::TableError;
//!
//! let err = TableError::BatchOperationFailed {
//!     index: 1,
//!     status: 409,
//!     code: Some("EntityAlreadyExists".into()),
//!     message: "The specified entity already exists.".into(),
//!     retryable: false,
//! };
//! assert_eq!(err.failed_index(), Some(1));
//! assert!(!err.is_retryable());
//! ```

use crate::core::types::EdmType;
use std::io;
use thiserror::Error;

/// Result type for Table codec operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors that can occur while encoding or decoding Table batches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TableError {
    /// A property value cannot be represented as its declared or inferred EDM type.
    #[error("Property '{property}' with value '{value}' cannot be read as {edm_type}")]
    PropertyFormat {
        property: String,
        value: String,
        edm_type: EdmType,
    },

    /// Client-side encryption was requested where it is not allowed, or was
    /// required but missing.
    #[error("Encryption policy violation: {0}")]
    EncryptionPolicyViolation(String),

    /// Encrypting or decrypting a property failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// One operation of a batch failed; the whole batch is aborted.
    ///
    /// `retryable` is `false` for conflicts the service reports explicitly
    /// (duplicate insert, missing entity) and `true` for any other status that
    /// does not match the operation kind.
    #[error("Batch operation {index} failed with status {status}: {message}")]
    BatchOperationFailed {
        index: usize,
        status: u16,
        code: Option<String>,
        message: String,
        retryable: bool,
    },

    /// The multipart response body does not follow the batch envelope structure.
    #[error("Malformed batch response: {0}")]
    MalformedResponse(String),

    /// The outer batch request was answered with an unexpected HTTP status.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// A batch must contain at least one operation.
    #[error("A batch must contain at least one operation")]
    EmptyBatch,

    /// The operation or batch breaks a caller-side precondition.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Parsing was abandoned at a cancellation point.
    #[error("Operation cancelled")]
    Cancelled,

    /// The injected transport failed to deliver the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error while reading the response stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid base64 payload.
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl TableError {
    pub(crate) fn property_format(
        property: impl Into<String>,
        value: impl Into<String>,
        edm_type: EdmType,
    ) -> Self {
        TableError::PropertyFormat {
            property: property.into(),
            value: value.into(),
            edm_type,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Returns `true` for transient failures:
    /// - I/O and transport errors
    /// - Malformed or truncated responses
    /// - Batch parts answered with an unexpected status
    /// - HTTP 408, 425, 429, 500, 502, 503, 504 on the outer request
    ///
    /// Returns `false` for conflicts, encoding errors and policy violations.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            TableError::BatchOperationFailed { retryable, .. } => *retryable,
            TableError::Http { status, .. } => {
                matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
            }
            TableError::Io(_) | TableError::MalformedResponse(_) | TableError::Transport(_) => {
                true
            }
            _ => false,
        }
    }

    /// Index of the failing operation, for batch failures.
    #[inline]
    #[must_use]
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            TableError::BatchOperationFailed { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// HTTP status associated with the error, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            TableError::BatchOperationFailed { status, .. } | TableError::Http { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

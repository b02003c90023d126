//! Status classification of response parts.
//!
//! | Kind | Success | SuccessEmpty | FailError | FailUnexpected |
//! |------|---------|--------------|-----------|----------------|
//! | `Retrieve` | 200 | 404 | - | anything else |
//! | `Insert` (echo) | 201 | - | 409 | anything else |
//! | `Insert` (no echo) | 204 | - | 409 | anything else |
//! | other kinds | 204 | - | 404 | anything else |
//!
//! Any combination not listed is `FailUnexpected`.

use crate::core::types::OperationKind;

/// Outcome of one response part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Expected status; the part is processed.
    Success,
    /// Valid status without data (retrieve of a missing entity).
    SuccessEmpty,
    /// Conflict reported by the service; not retryable.
    FailError,
    /// Status that does not fit the operation kind; retryable.
    FailUnexpected,
}

impl Classification {
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Classification::FailError | Classification::FailUnexpected
        )
    }

    /// Retryability of a failed part.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Classification::FailUnexpected)
    }
}

/// Classify the status of a batch response part.
pub fn classify(kind: OperationKind, echo_content: bool, status: u16) -> Classification {
    match kind {
        OperationKind::Retrieve => match status {
            200 => Classification::Success,
            404 => Classification::SuccessEmpty,
            _ => Classification::FailUnexpected,
        },
        OperationKind::Insert => {
            if status == expected_status(kind, echo_content) {
                Classification::Success
            } else if status == 409 {
                Classification::FailError
            } else {
                Classification::FailUnexpected
            }
        }
        _ => match status {
            204 => Classification::Success,
            404 => Classification::FailError,
            _ => Classification::FailUnexpected,
        },
    }
}

/// Status a successful operation of `kind` is answered with.
pub fn expected_status(kind: OperationKind, echo_content: bool) -> u16 {
    match kind {
        OperationKind::Retrieve => 200,
        OperationKind::Insert if echo_content => 201,
        _ => 204,
    }
}

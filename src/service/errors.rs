//! Promotions service errors.

use thiserror::Error;

use crate::{lifecycle::TransitionError, promotions::EvaluationError, validation::ValidationError};

/// Errors returned by a [`PromotionsService`](super::PromotionsService).
#[derive(Debug, Error)]
pub enum PromotionsServiceError {
    /// The promotion configuration is invalid.
    #[error("invalid promotion")]
    Validation(#[from] ValidationError),

    /// The requested status change is not allowed.
    #[error("invalid status change")]
    Transition(#[from] TransitionError),

    /// Another promotion of the tenant already uses the code.
    #[error("promotion code `{0}` already in use")]
    Conflict(String),

    /// The promotion changed since it was read.
    #[error("promotion is at version {actual}, expected {expected}")]
    StaleVersion {
        /// Version the caller read
        expected: u64,
        /// Current version
        actual: u64,
    },

    /// No such promotion for the tenant.
    #[error("promotion not found")]
    NotFound,

    /// Expired promotions cannot be changed.
    #[error("promotion has expired and can no longer be changed")]
    Frozen,

    /// Evaluating the promotion failed.
    #[error("evaluation failed")]
    Evaluation(#[from] EvaluationError),

    /// A temporary storage failure; the operation may be retried.
    #[error("temporary failure: {0}")]
    Transient(String),

    /// The operation did not complete in time.
    #[error("operation timed out")]
    Timeout,
}

impl PromotionsServiceError {
    /// Whether retrying the operation may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout)
    }
}

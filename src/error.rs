//! # Error Taxonomy
//!
//! Backend failures arrive as [`BackendError`] and are converted at the
//! coordinator, poller, and timeline boundaries into the narrower errors
//! presentation code handles. Nothing above those boundaries sees a raw
//! transport error.

use crate::model::OrderId;
use thiserror::Error;

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retry on the next natural cycle or on explicit user action.
    Transient,
    /// The goal was already reached by someone else. Treat as success.
    TerminalBenign,
    /// The request itself is wrong. Show inline, do not retry as-is.
    Validation,
}

/// Errors reported by an [`OrderBackend`](crate::backend::OrderBackend).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Order {0} is no longer pending")]
    NotPending(OrderId),

    #[error("Order {0} not found")]
    NotFound(OrderId),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl BackendError {
    pub fn kind(&self) -> FailureKind {
        match self {
            BackendError::NotPending(_) => FailureKind::TerminalBenign,
            BackendError::Validation(_) => FailureKind::Validation,
            BackendError::Network(_)
            | BackendError::Timeout
            | BackendError::NotFound(_)
            | BackendError::Server(_) => FailureKind::Transient,
        }
    }
}

/// Why an accept did not go through. Every variant leaves the alert in place.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AcceptError {
    /// Try again; the alert stays and the control is re-enabled.
    #[error("Accept failed, please retry: {0}")]
    Retryable(String),

    /// The accept call exceeded the client-side timeout. This says nothing
    /// about whether the server accepted; a retry settles it.
    #[error("Accept timed out, please retry")]
    Timeout,

    #[error("{0}")]
    Validation(String),

    /// The alert desk has been shut down.
    #[error("Alert desk is no longer running")]
    Unavailable,
}

impl AcceptError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AcceptError::Validation(_) => FailureKind::Validation,
            _ => FailureKind::Transient,
        }
    }
}

/// A poll cycle that did not reconcile. The working set is left untouched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PollError {
    #[error("Pending-order fetch failed: {0}")]
    Fetch(#[from] BackendError),

    #[error("Working set unavailable: {0}")]
    WorkingSet(String),
}

/// A timeline fetch that failed. The previous timeline stays displayed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TimelineError {
    #[error("Timeline fetch failed: {0}")]
    Fetch(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_classification() {
        assert_eq!(
            BackendError::NotPending(OrderId::from("o1")).kind(),
            FailureKind::TerminalBenign
        );
        assert_eq!(
            BackendError::Validation("bad eta".into()).kind(),
            FailureKind::Validation
        );
        assert_eq!(BackendError::Timeout.kind(), FailureKind::Transient);
        assert_eq!(
            BackendError::Network("reset".into()).kind(),
            FailureKind::Transient
        );
    }
}

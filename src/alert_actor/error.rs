//! Error types for the alert actor.

use crate::model::OrderId;
use keyed_actor::FrameworkError;
use thiserror::Error;

/// Errors that can occur during working-set operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AlertError {
    /// Only orders awaiting acceptance may be raised.
    #[error("Order {0} is not pending")]
    NotPending(OrderId),

    #[error("Alert not found: {0}")]
    NotFound(String),

    /// The working-set actor has shut down.
    #[error("Working set closed")]
    Closed,

    #[error("Unexpected action result for {0}")]
    UnexpectedResult(&'static str),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for AlertError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => AlertError::Closed,
            FrameworkError::NotFound(id) => AlertError::NotFound(id),
            other => AlertError::ActorCommunicationError(other.to_string()),
        }
    }
}

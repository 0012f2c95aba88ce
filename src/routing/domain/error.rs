//! Dispatch errors.

use crate::agent::domain::AgentName;
use crate::message::domain::{ErrorPayload, MessageType};
use std::time::Duration;
use thiserror::Error;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors returned while routing or dispatching a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The receiving agent is not registered.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentName),

    /// No registered agent offers the capability.
    #[error("no agent offers capability '{0}'")]
    NoProvider(String),

    /// The agent refused the request because it is saturated.
    #[error("agent busy: {0}")]
    AgentBusy(AgentName),

    /// The agent did not answer before the deadline.
    #[error("task '{capability}' timed out after {timeout:?}")]
    TaskTimedOut {
        /// Capability that was dispatched.
        capability: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The agent answered with an error, returned `Err`, or panicked.
    #[error("agent '{agent}' failed ({}): {}", .payload.error_type, .payload.error)]
    AgentFailed {
        /// Failing agent.
        agent: AgentName,
        /// Error details reported by or for the agent.
        payload: ErrorPayload,
    },

    /// The agent answered with something other than a response or error.
    #[error("agent '{agent}' answered with an unexpected {received} message")]
    UnexpectedReply {
        /// Answering agent.
        agent: AgentName,
        /// Type of the reply.
        received: MessageType,
    },

    /// The reply was not correlated to the request.
    #[error("agent '{0}' answered outside the request's correlation chain")]
    CorrelationMismatch(AgentName),
}

impl DispatchError {
    /// Returns whether the same dispatch may succeed if retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::AgentBusy(_) | Self::TaskTimedOut { .. } => true,
            Self::AgentFailed { payload, .. } => payload.retryable,
            Self::AgentNotFound(_)
            | Self::NoProvider(_)
            | Self::UnexpectedReply { .. }
            | Self::CorrelationMismatch(_) => false,
        }
    }
}

//! Agent contract consumed by the registry and the message router.

use crate::agent::domain::{AgentIdentity, AgentName, AgentStatus, Capability};
use crate::message::domain::{ErrorPayload, Message, MessageType};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Error type used for handler failures without a more specific category.
const GENERIC_ERROR_TYPE: &str = "agent_error";

/// A unit of work that exposes named capabilities.
///
/// `handle` receives a `Request` message and answers with a `Response` or
/// an `Error` message correlated to the request. Returning `Err` is also
/// accepted; the router translates it into a failed dispatch.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the static identity declared by the agent.
    fn identity(&self) -> &AgentIdentity;

    /// Returns the agent name.
    fn name(&self) -> &AgentName {
        self.identity().name()
    }

    /// Returns the declared capabilities.
    fn capabilities(&self) -> &[Capability] {
        self.identity().capabilities()
    }

    /// Returns the names of agents this agent depends on.
    fn dependencies(&self) -> &[AgentName] {
        self.identity().dependencies()
    }

    /// Returns the current runtime status.
    fn status(&self) -> AgentStatus {
        AgentStatus::Idle
    }

    /// Prepares the agent before it is registered.
    async fn initialize(&self) -> AgentResult<()> {
        Ok(())
    }

    /// Releases agent resources after deregistration.
    async fn shutdown(&self) -> AgentResult<()> {
        Ok(())
    }

    /// Handles one incoming message.
    async fn handle(&self, message: Message) -> AgentResult<Message>;
}

/// Capability execution without message bookkeeping.
///
/// Wrap an implementation in
/// [`ManagedAgent`](crate::agent::adapters::ManagedAgent) to obtain an
/// [`Agent`] that validates requests, tracks status and builds replies.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Returns the static identity declared by the handler.
    fn identity(&self) -> &AgentIdentity;

    /// Prepares the handler.
    async fn initialize(&self) -> AgentResult<()> {
        Ok(())
    }

    /// Releases handler resources.
    async fn shutdown(&self) -> AgentResult<()> {
        Ok(())
    }

    /// Runs `capability` with `parameters` and returns its result.
    async fn execute(&self, capability: &str, parameters: Value) -> AgentResult<Value>;
}

/// Agent-side failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    /// The agent received something other than a request.
    #[error("agent '{agent}' only accepts request messages, received {received}")]
    UnexpectedMessageType {
        /// Receiving agent.
        agent: String,
        /// Type of the rejected message.
        received: MessageType,
    },

    /// The request named a capability the agent does not declare.
    #[error("agent '{agent}' does not support capability '{capability}'")]
    UnsupportedCapability {
        /// Receiving agent.
        agent: String,
        /// Requested capability.
        capability: String,
    },

    /// The request parameters were rejected.
    #[error("invalid parameters for '{capability}': {reason}")]
    InvalidParameters {
        /// Requested capability.
        capability: String,
        /// Validation failure.
        reason: String,
    },

    /// The agent has been shut down.
    #[error("agent '{0}' is offline")]
    Offline(String),

    /// The capability ran and failed.
    #[error("{message}")]
    Failed {
        /// Failure description.
        message: String,
        /// Machine-readable category.
        error_type: String,
        /// Whether retrying may succeed.
        retryable: bool,
    },
}

impl AgentError {
    /// Creates a generic, retryable failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            error_type: GENERIC_ERROR_TYPE.to_owned(),
            retryable: true,
        }
    }

    /// Creates a categorised failure that must not be retried.
    pub fn permanent(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            error_type: error_type.into(),
            retryable: false,
        }
    }

    /// Returns the machine-readable failure category.
    #[must_use]
    pub fn error_type(&self) -> &str {
        match self {
            Self::UnexpectedMessageType { .. } => "unexpected_message_type",
            Self::UnsupportedCapability { .. } => "unsupported_capability",
            Self::InvalidParameters { .. } => "invalid_parameters",
            Self::Offline(_) => "agent_offline",
            Self::Failed { error_type, .. } => error_type,
        }
    }

    /// Returns whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::UnexpectedMessageType { .. }
            | Self::UnsupportedCapability { .. }
            | Self::InvalidParameters { .. } => false,
            Self::Offline(_) => true,
            Self::Failed { retryable, .. } => *retryable,
        }
    }

    /// Converts the error into an `Error` message payload.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.to_string(), self.error_type(), self.is_retryable())
    }
}

//! Error types for agent domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing agent domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentDomainError {
    /// The agent name is empty after trimming.
    #[error("agent name must not be empty")]
    EmptyAgentName,

    /// The agent name contains characters outside `[A-Za-z0-9_.-]`.
    #[error(
        "agent name '{0}' contains invalid characters (only alphanumerics, '_', '-' and '.' allowed)"
    )]
    InvalidAgentName(String),

    /// The agent name exceeds the 100-character limit.
    #[error("agent name exceeds 100 character limit: {0}")]
    AgentNameTooLong(String),

    /// The agent version is empty after trimming.
    #[error("agent version must not be empty")]
    EmptyVersion,

    /// A capability name is empty after trimming.
    #[error("capability name must not be empty")]
    EmptyCapabilityName,

    /// The same capability was declared twice by one agent.
    #[error("agent '{agent}' declares capability '{capability}' more than once")]
    DuplicateCapability {
        /// Declaring agent.
        agent: String,
        /// Repeated capability name.
        capability: String,
    },

    /// An agent listed itself as a dependency.
    #[error("agent '{0}' cannot depend on itself")]
    SelfDependency(String),
}

/// Error returned while parsing an agent status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent status: {0}")]
pub struct ParseAgentStatusError(pub String);

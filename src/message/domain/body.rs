//! Message bodies and message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Kind of a coordination message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Asks an agent to run one of its capabilities.
    Request,
    /// Successful answer to a request.
    Response,
    /// Fire-and-forget event.
    Notification,
    /// Failed answer to a request.
    Error,
    /// Intermediate progress for a request.
    Progress,
}

impl MessageType {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Notification => "notification",
            Self::Error => "error",
            Self::Progress => "progress",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing a message type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown message type: {0}")]
pub struct ParseMessageTypeError(pub String);

impl TryFrom<&str> for MessageType {
    type Error = ParseMessageTypeError;

    fn try_from(value: &str) -> Result<Self, ParseMessageTypeError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "response" => Ok(Self::Response),
            "notification" => Ok(Self::Notification),
            "error" => Ok(Self::Error),
            "progress" => Ok(Self::Progress),
            _ => Err(ParseMessageTypeError(value.to_owned())),
        }
    }
}

/// Payload of an `Error` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable failure description.
    pub error: String,
    /// Machine-readable failure category.
    pub error_type: String,
    /// Whether the caller may retry the same request.
    pub retryable: bool,
}

impl ErrorPayload {
    /// Creates an error payload.
    #[must_use]
    pub fn new(error: impl Into<String>, error_type: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: error.into(),
            error_type: error_type.into(),
            retryable,
        }
    }
}

/// Typed message body. The variant fixes the [`MessageType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    /// Capability invocation.
    Request {
        /// Capability name.
        task: String,
        /// Capability input.
        parameters: Value,
    },
    /// Capability output.
    Response {
        /// Result value produced by the agent.
        result: Value,
    },
    /// Event broadcast by an agent or the coordinator.
    Notification {
        /// Event name.
        event: String,
        /// Event data.
        data: Value,
    },
    /// Capability failure.
    Error(ErrorPayload),
    /// Intermediate progress, in `0.0..=1.0`.
    Progress {
        /// Completed fraction.
        progress: f64,
        /// Optional status line.
        detail: Option<String>,
    },
}

impl MessageBody {
    /// Returns the message type implied by this body.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Request { .. } => MessageType::Request,
            Self::Response { .. } => MessageType::Response,
            Self::Notification { .. } => MessageType::Notification,
            Self::Error(_) => MessageType::Error,
            Self::Progress { .. } => MessageType::Progress,
        }
    }

    /// Returns the result carried by a `Response`, consuming the body.
    #[must_use]
    pub fn into_result(self) -> Option<Value> {
        match self {
            Self::Response { result } => Some(result),
            _ => None,
        }
    }
}

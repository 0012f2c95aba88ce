//! Message priority.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Delivery priority attached to a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    /// Latency-sensitive work.
    High,
    /// Default priority.
    #[default]
    Medium,
    /// Background work.
    Low,
}

impl MessagePriority {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing a message priority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown message priority: {0}")]
pub struct ParseMessagePriorityError(pub String);

impl TryFrom<&str> for MessagePriority {
    type Error = ParseMessagePriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseMessagePriorityError(value.to_owned())),
        }
    }
}

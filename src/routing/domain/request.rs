//! Dispatch request parameters.

use crate::agent::domain::AgentName;
use crate::message::domain::{MessageId, MessagePriority};
use serde_json::Value;
use std::time::Duration;

/// Sender name used when the coordinator itself originates a request.
pub(crate) const COORDINATOR_SENDER: &str = "coordinator";

/// Everything needed to send one request to one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    sender: String,
    receiver: AgentName,
    capability: String,
    parameters: Value,
    priority: MessagePriority,
    timeout: Option<Duration>,
    correlation_id: Option<MessageId>,
}

impl DispatchRequest {
    /// Creates a request from the coordinator with medium priority and no
    /// deadline.
    #[must_use]
    pub fn new(receiver: AgentName, capability: impl Into<String>, parameters: Value) -> Self {
        Self {
            sender: COORDINATOR_SENDER.to_owned(),
            receiver,
            capability: capability.into(),
            parameters,
            priority: MessagePriority::default(),
            timeout: None,
            correlation_id: None,
        }
    }

    /// Sets the sender name.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets or clears the deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Threads the request into an existing correlation chain.
    #[must_use]
    pub const fn with_correlation_id(mut self, correlation_id: MessageId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Returns the sender name.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the receiving agent.
    #[must_use]
    pub const fn receiver(&self) -> &AgentName {
        &self.receiver
    }

    /// Returns the capability name.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Returns the parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> MessagePriority {
        self.priority
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the explicit correlation id, if any.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<MessageId> {
        self.correlation_id
    }
}

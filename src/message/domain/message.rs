//! The coordination message envelope.

use super::{ErrorPayload, MessageBody, MessageId, MessagePriority, MessageType};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message exchanged between the coordinator and an agent.
///
/// # Invariants
///
/// - `correlation_id` equals `id` for messages that start a chain and the
///   originating request's id for replies and progress updates.
/// - The message type is derived from the body and cannot disagree with it.
///
/// # Examples
///
/// ```
/// use conductor::message::domain::{Message, MessageType};
/// use mockable::DefaultClock;
/// use serde_json::json;
///
/// let clock = DefaultClock;
/// let request = Message::request("coordinator", "writer", "draft", json!({}), &clock);
/// let reply = request.reply(json!("done"), &clock);
///
/// assert_eq!(reply.message_type(), MessageType::Response);
/// assert_eq!(reply.correlation_id(), request.id());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    sender: String,
    receiver: String,
    body: MessageBody,
    correlation_id: MessageId,
    priority: MessagePriority,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn build<C: Clock + ?Sized>(
        sender: String,
        receiver: String,
        body: MessageBody,
        correlation_id: Option<MessageId>,
        clock: &C,
    ) -> Self {
        let id = MessageId::new();
        Self {
            id,
            sender,
            receiver,
            body,
            correlation_id: correlation_id.unwrap_or(id),
            priority: MessagePriority::default(),
            timestamp: clock.utc(),
        }
    }

    /// Creates a request asking `receiver` to run capability `task`.
    #[must_use]
    pub fn request<C: Clock + ?Sized>(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        task: impl Into<String>,
        parameters: Value,
        clock: &C,
    ) -> Self {
        let body = MessageBody::Request {
            task: task.into(),
            parameters,
        };
        Self::build(sender.into(), receiver.into(), body, None, clock)
    }

    /// Creates a notification that starts its own correlation chain.
    #[must_use]
    pub fn notification<C: Clock + ?Sized>(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        event: impl Into<String>,
        data: Value,
        clock: &C,
    ) -> Self {
        let body = MessageBody::Notification {
            event: event.into(),
            data,
        };
        Self::build(sender.into(), receiver.into(), body, None, clock)
    }

    /// Builds a `Response` to this message carrying `result`.
    #[must_use]
    pub fn reply<C: Clock + ?Sized>(&self, result: Value, clock: &C) -> Self {
        self.answer(MessageBody::Response { result }, clock)
    }

    /// Builds an `Error` reply to this message.
    #[must_use]
    pub fn reply_error<C: Clock + ?Sized>(&self, payload: ErrorPayload, clock: &C) -> Self {
        self.answer(MessageBody::Error(payload), clock)
    }

    /// Builds a `Progress` update for this message.
    ///
    /// `progress` is clamped into `0.0..=1.0`; NaN is reported as `0.0`.
    #[must_use]
    pub fn progress<C: Clock + ?Sized>(
        &self,
        progress: f64,
        detail: Option<String>,
        clock: &C,
    ) -> Self {
        let clamped = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        self.answer(
            MessageBody::Progress {
                progress: clamped,
                detail,
            },
            clock,
        )
    }

    fn answer<C: Clock + ?Sized>(&self, body: MessageBody, clock: &C) -> Self {
        let mut message = Self::build(
            self.receiver.clone(),
            self.sender.clone(),
            body,
            Some(self.correlation_id),
            clock,
        );
        message.priority = self.priority;
        message
    }

    /// Sets the message priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Threads this message into an existing correlation chain.
    #[must_use]
    pub const fn with_correlation_id(mut self, correlation_id: MessageId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the sender name.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the receiver name.
    #[must_use]
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Returns the typed body.
    #[must_use]
    pub const fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Consumes the message and returns its body.
    #[must_use]
    pub fn into_body(self) -> MessageBody {
        self.body
    }

    /// Returns the message type.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    /// Returns the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> MessageId {
        self.correlation_id
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> MessagePriority {
        self.priority
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the capability name and parameters when this is a request.
    #[must_use]
    pub fn as_request(&self) -> Option<(&str, &Value)> {
        match &self.body {
            MessageBody::Request { task, parameters } => Some((task.as_str(), parameters)),
            _ => None,
        }
    }
}

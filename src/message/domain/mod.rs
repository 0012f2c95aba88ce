//! Domain types for coordination messages.
//!
//! Messages are immutable once built. The body variant determines the
//! message type, so a request can never carry a response payload.

mod body;
mod ids;
mod message;
mod priority;

pub use body::{ErrorPayload, MessageBody, MessageType, ParseMessageTypeError};
pub use ids::MessageId;
pub use message::Message;
pub use priority::{MessagePriority, ParseMessagePriorityError};

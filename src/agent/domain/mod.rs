//! Domain model for agent identity, capabilities and runtime counters.
//!
//! Identities are authored by agent implementations and are immutable once
//! handed to the registry. Runtime counters live in
//! [`AgentRegistration`], which only the registry mutates.

mod capability;
mod error;
mod identity;
mod name;
mod registration;
mod status;

pub use capability::Capability;
pub use error::{AgentDomainError, ParseAgentStatusError};
pub use identity::AgentIdentity;
pub use name::AgentName;
pub use registration::AgentRegistration;
pub use status::AgentStatus;

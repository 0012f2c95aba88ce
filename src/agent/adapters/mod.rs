//! Agent adapters.
//!
//! [`ManagedAgent`] adds request validation, status tracking and reply
//! construction to any [`CapabilityHandler`](crate::agent::ports::CapabilityHandler).
//! [`ScriptedAgent`] is a deterministic handler for tests and local runs.

mod managed;
mod scripted;

pub use managed::ManagedAgent;
pub use scripted::{Script, ScriptedAgent};

//! Port contracts implemented by agents.
//!
//! The coordinator only depends on these traits; concrete agents (language
//! model calls, media generation and so on) live outside the crate.

pub mod agent;

pub use agent::{Agent, AgentError, AgentResult, CapabilityHandler};

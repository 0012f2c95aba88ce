//! Conductor: in-process agent coordination and workflow scheduling.
//!
//! This crate registers independent agents that expose named capabilities,
//! routes requests to them with optional load balancing and runs workflows
//! expressed as dependency graphs across those agents.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types and rules with no runtime dependencies
//! - **Ports**: Trait interfaces implemented outside the crate (agents,
//!   progress reporting)
//! - **Adapters**: Concrete port implementations shipped with the crate
//! - **Services**: Stateful orchestration built on the above
//!
//! # Modules
//!
//! - [`agent`]: Agent contract, identity types and the agent registry
//! - [`message`]: Typed messages exchanged with agents
//! - [`routing`]: Provider selection and request dispatch
//! - [`workflow`]: Workflow graphs, staging and staged execution
//! - [`health`]: Heartbeat-based eviction loop
//! - [`metrics`]: Aggregate counters
//! - [`config`]: Coordinator tunables
//! - [`coordinator`]: The facade wiring everything together

pub mod agent;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod health;
pub mod message;
pub mod metrics;
pub mod routing;
pub mod workflow;

//! Application services for agent registration and discovery.

mod registry;

pub use registry::{AgentRegistry, AgentSnapshot, RegistryError, RegistryResult};

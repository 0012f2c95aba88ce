//! Agent contract and registry for the coordinator.
//!
//! Agents are independent units of work that expose named capabilities and
//! answer request messages. This module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - The agent contract in [`ports`]
//! - Composable agent helpers and deterministic test agents in [`adapters`]
//! - The shared agent registry in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

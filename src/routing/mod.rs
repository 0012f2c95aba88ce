//! Message routing and load balancing.
//!
//! The router resolves which agent handles a capability, dispatches a
//! request with an optional deadline, and records the outcome against the
//! agent registry and the coordinator metrics.
//!
//! - Strategy, request and error types in [`domain`]
//! - The router service in [`services`]

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;

//! Heartbeat-based agent eviction.

mod monitor;

pub use monitor::{HealthMonitor, HealthMonitorError};

#[cfg(test)]
mod tests;

//! Provider selection strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the router picks among several agents offering one capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    /// Cycle through providers with a per-capability counter.
    #[default]
    RoundRobin,
    /// Pick the provider with the fewest dispatched messages; ties go to the
    /// earliest registration.
    LeastLoaded,
    /// Pick uniformly at random.
    Random,
}

impl LoadBalanceStrategy {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::LeastLoaded => "least_loaded",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for LoadBalanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing a load-balancing strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown load balancing strategy: {0}")]
pub struct ParseLoadBalanceStrategyError(pub String);

impl TryFrom<&str> for LoadBalanceStrategy {
    type Error = ParseLoadBalanceStrategyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "round_robin" => Ok(Self::RoundRobin),
            "least_loaded" => Ok(Self::LeastLoaded),
            "random" => Ok(Self::Random),
            _ => Err(ParseLoadBalanceStrategyError(value.to_owned())),
        }
    }
}

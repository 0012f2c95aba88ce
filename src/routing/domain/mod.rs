//! Domain types for message routing.

mod error;
mod request;
mod strategy;

pub use error::{DispatchError, DispatchResult};
pub use request::DispatchRequest;
pub use strategy::{LoadBalanceStrategy, ParseLoadBalanceStrategyError};

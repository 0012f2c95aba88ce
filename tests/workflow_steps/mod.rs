//! Step definitions for workflow execution scenarios.

mod given;
mod then;
mod when;
pub mod world;

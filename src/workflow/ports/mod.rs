//! Port contracts for the workflow executor.

pub mod progress;

pub use progress::{NoopProgressReporter, ProgressReporter};

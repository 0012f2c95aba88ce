//! Workflow orchestration services.

mod error;
mod executor;

pub use error::{WorkflowError, WorkflowResult};
pub use executor::WorkflowExecutor;

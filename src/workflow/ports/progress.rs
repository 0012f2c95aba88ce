//! Progress-reporting port.
//!
//! How updates reach viewers (sockets, logs, queues) is up to the
//! implementation; the executor only calls [`ProgressReporter::report`] at
//! stage boundaries and once more on success.

use crate::workflow::domain::ProgressUpdate;

/// Receives workflow progress updates.
///
/// Closures taking `&ProgressUpdate` implement this trait directly.
pub trait ProgressReporter: Send + Sync {
    /// Handles one update. Must not block for long; the executor waits for
    /// it before launching the stage.
    fn report(&self, update: &ProgressUpdate);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: &ProgressUpdate) {
        self(update);
    }
}

/// Reporter that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressReporter;

impl ProgressReporter for NoopProgressReporter {
    fn report(&self, _update: &ProgressUpdate) {}
}

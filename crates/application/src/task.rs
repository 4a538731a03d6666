//! Cancellable background tasks

use std::future::Future;

use tokio::task::JoinHandle;

/// A spawned background task that is aborted when the handle is dropped.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn `future` on the current runtime.
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = name, "spawning background task");
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }

    /// Task name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once the task stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!(task = self.name, "cancelling background task");
        }
        self.handle.abort();
    }
}

//! Trailing-edge debounce for search input.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Runs only the last task of a burst, once `delay` passes without a new call.
///
/// Only the waiting phase is cancelled by a newer call. Once the delay has
/// elapsed the task runs to completion on its own; superseding an in-flight
/// fetch is the table's job.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Restarts the timer with `task`. Must be called within a tokio runtime.
    pub fn call<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = tokio::time::Instant::now() + self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tokio::spawn(task);
        });
        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Drops a waiting task without running it.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Cancelable one-shot timers
//!
//! A `TimerHandle` owns the spawned task. Cancelling or dropping the handle
//! aborts it, so a timer can never fire after its owner is gone.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a pending one-shot timer
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Run `f` after `delay` on the current tokio runtime
    ///
    /// Must be called from within a runtime.
    pub fn schedule<F>(delay: Duration, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::schedule_async(delay, async move { f() })
    }

    /// Run `fut` to completion after `delay`
    pub fn schedule_async<Fut>(delay: Duration, fut: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        });
        Self { task }
    }

    /// Abort the timer (no-op if it already fired)
    pub fn cancel(self) {
        // Drop does the work
    }

    /// Timer fired or was aborted
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

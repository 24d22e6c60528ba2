//! Cancellable repeating task
//!
//! A [`RepeatingTask`] runs a step function every `period`, first firing one
//! period after it is spawned. The step decides whether to keep going. The
//! handle owns the task: cancelling it or dropping it aborts the task, so
//! replacing the one handle a component holds is enough to stop the old
//! timer.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Handle to a periodic tokio task
#[derive(Debug)]
pub struct RepeatingTask {
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Spawn `step` on the current tokio runtime, every `period`.
    ///
    /// The task ends on its own when `step` returns `ControlFlow::Break`.
    pub fn spawn<F, Fut>(period: Duration, mut step: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if step().await.is_break() {
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Stop the task. No step starts after this returns.
    pub fn cancel(self) {
        self.handle.abort();
    }

    /// True once the task has stopped, on its own or by cancellation
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

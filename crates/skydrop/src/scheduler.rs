//! Cancellable timers.
//!
//! Views own their timers through a [`TaskSet`]. Dropping a
//! [`ScheduledTask`] aborts the underlying tokio task, so a view that goes
//! away can never fire a late update.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// A handle to one spawned timer task.
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn a future as a named task.
    #[must_use]
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        trace!(task = name, "Scheduling task");
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }

    /// Run `action` once after `delay`.
    #[must_use]
    pub fn once<A>(name: &'static str, delay: Duration, action: A) -> Self
    where
        A: FnOnce() + Send + 'static,
    {
        Self::spawn(name, async move {
            tokio::time::sleep(delay).await;
            trace!(task = name, "Timer fired");
            action();
        })
    }

    /// Run `action` every `period`, starting one period from now.
    ///
    /// A zero period is treated as one millisecond.
    #[must_use]
    pub fn every<A>(name: &'static str, period: Duration, mut action: A) -> Self
    where
        A: FnMut() + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        Self::spawn(name, async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                trace!(task = name, "Interval tick");
                action();
            }
        })
    }

    /// Name given at spawn time.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Abort the task. Has no effect once it finished.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Check if the task has completed or been aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A collection of tasks cancelled together.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<ScheduledTask>,
}

impl TaskSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a task.
    pub fn add(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    /// Abort every task and forget them.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.cancel();
        }
    }

    /// Number of tasks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the set holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks that have not finished yet.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }
}

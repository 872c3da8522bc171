/*!
 * Periodic Task
 * A unit of guest work with a fixed period and next-due timestamp
 */

use std::time::{Duration, Instant};

/// Task callback, owned exclusively by one partition's executor
pub type TaskFn = Box<dyn FnMut() + Send + 'static>;

pub(crate) struct Task {
    pub name: String,
    pub callback: TaskFn,
    pub period: Duration,
    pub next_due: Instant,
    pub active: bool,
    pub failures: u64,
}

impl Task {
    /// First due time is one full period from now; there is no immediate
    /// first run.
    pub fn new(name: String, callback: TaskFn, period: Duration) -> Self {
        Self {
            name,
            callback,
            period,
            next_due: Instant::now() + period,
            active: true,
            failures: 0,
        }
    }
}

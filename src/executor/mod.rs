/*!
 * Task Executor
 * Guest-side cooperative runner for periodic tasks and inbox draining
 */

mod task;

pub use task::TaskFn;

use crate::core::types::{PartitionId, TaskId};
use crate::hypervisor::{Hypervisor, ShutdownToken};
use crate::ipc::Message;
use log::{debug, error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use task::Task;

/// Fixed executor tick: the loop's sleep interval and the poll cadence of
/// [`TaskExecutor::recv_message`]
pub const TICK: Duration = Duration::from_millis(1);

/// Observer invoked for each inbound message the executor drains
pub type MessageObserver = Box<dyn FnMut(Message) + Send + 'static>;

/// Handle to stop a running executor from another thread or from one of
/// its own tasks
#[derive(Clone)]
pub struct ExecutorHandle {
    running: Arc<AtomicBool>,
}

impl ExecutorHandle {
    /// Request a stop, observed at the top of the next loop iteration. A
    /// task that is mid-run is never interrupted.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Cooperative task runner for one partition
///
/// Single-threaded: tasks within one partition never run concurrently
/// with each other. Each loop iteration runs every active task whose due
/// time has elapsed, drains at most one pending message, sleeps for one
/// tick, and yields.
///
/// A task callback that panics is caught at the loop boundary, counted on
/// the task, and the loop continues: one failing task cannot halt its
/// partition, and a failing partition never blocks another partition's
/// scheduling or messaging.
pub struct TaskExecutor {
    hv: Hypervisor,
    partition_id: PartitionId,
    tasks: Vec<Task>,
    running: Arc<AtomicBool>,
    shutdown: ShutdownToken,
    observer: Option<MessageObserver>,
}

impl TaskExecutor {
    pub fn new(hv: &Hypervisor, partition_id: PartitionId) -> Self {
        Self {
            shutdown: hv.shutdown_token(),
            hv: hv.clone(),
            partition_id,
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    /// Register a periodic task
    ///
    /// The first run happens one full period from now. Missed cycles are
    /// dropped, not replayed: after each run the next due time is one
    /// period from that run, so no backlog accumulates.
    pub fn create_task(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut() + Send + 'static,
        period: Duration,
    ) -> TaskId {
        let name = name.into();
        debug!(
            "partition {}: task '{}' registered (period {:?})",
            self.partition_id, name, period
        );
        self.tasks.push(Task::new(name, Box::new(callback), period));
        self.tasks.len() - 1
    }

    /// Install the observer handed each drained inbound message
    ///
    /// Without an observer, drained messages are logged and discarded.
    pub fn on_message(&mut self, observer: impl FnMut(Message) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            running: Arc::clone(&self.running),
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Panic count of a task's callback so far
    pub fn task_failures(&self, task: TaskId) -> Option<u64> {
        self.tasks.get(task).map(|t| t.failures)
    }

    /// Enable or disable a task; inactive tasks are skipped by the loop
    pub fn set_task_active(&mut self, task: TaskId, active: bool) {
        if let Some(task) = self.tasks.get_mut(task) {
            task.active = active;
        }
    }

    /// Run the executor loop on the calling thread
    ///
    /// Returns when [`ExecutorHandle::stop`] is called or the hypervisor's
    /// shutdown token trips.
    pub fn start(&mut self) {
        self.running.store(true, Ordering::Release);
        info!(
            "partition {}: executor started with {} tasks",
            self.partition_id,
            self.tasks.len()
        );

        while self.running.load(Ordering::Acquire) && !self.shutdown.is_shutdown() {
            let now = Instant::now();

            for task in self.tasks.iter_mut() {
                if !task.active || now < task.next_due {
                    continue;
                }
                // Rescheduled from this run, not from the missed deadline:
                // skipped ticks are dropped.
                task.next_due = now + task.period;

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| (task.callback)()));
                if outcome.is_err() {
                    task.failures += 1;
                    error!(
                        "partition {}: task '{}' panicked ({} failures so far), continuing",
                        self.partition_id, task.name, task.failures
                    );
                }
            }

            if let Some(message) = self.hv.try_receive(self.partition_id) {
                match self.observer.as_mut() {
                    Some(observer) => observer(message),
                    None => debug!(
                        "partition {}: message from {} ({} bytes)",
                        self.partition_id,
                        message.from_partition,
                        message.payload.len()
                    ),
                }
            }

            thread::sleep(TICK);
            self.yield_now();
        }

        self.running.store(false, Ordering::Release);
        info!("partition {}: executor stopped", self.partition_id);
    }

    /// Request a stop of a running executor; see [`ExecutorHandle::stop`]
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Advisory suspension point, once per loop iteration
    ///
    /// The host's scheduling is advisory round-robin; there is no
    /// preemption to hand control back to, so this deliberately does
    /// nothing beyond hinting the OS scheduler. It marks where a true
    /// check-in would go.
    #[inline]
    pub fn yield_now(&self) {
        thread::yield_now();
    }

    /// Receive an inter-partition message
    ///
    /// A zero timeout is one non-blocking poll. Otherwise polls the inbox
    /// on a fixed [`TICK`] cadence until a message arrives or the deadline
    /// elapses.
    pub fn recv_message(&self, timeout: Duration) -> Option<Message> {
        if timeout.is_zero() {
            return self.hv.try_receive(self.partition_id);
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.hv.try_receive(self.partition_id) {
                return Some(message);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(TICK);
        }
    }
}

/*!
 * Hypervisor Module
 * Partition lifecycle, quota scheduling, and the routing control surface
 */

pub(crate) mod partition;
pub(crate) mod registry;
mod scheduler;
mod stats;

pub use scheduler::DEFAULT_QUOTA;
pub use stats::{PartitionGrantStats, SchedulerStats};

use crate::core::errors::{HvResult, HypervisorError};
use crate::core::types::{PartitionConfig, PartitionId};
use crate::ipc::router::MessageRouter;
use crate::ipc::Message;
use log::{debug, info, warn};
use parking_lot::Mutex;
use registry::PartitionRegistry;
use scheduler::Scheduler;
use stats::AtomicSchedStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of the hypervisor
///
/// Transitions are one-way: Idle -> Running -> Stopped. Violations fail
/// fast rather than being silently tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// Cooperative shutdown signal observed by guest code
///
/// Cancellation is best-effort: the hypervisor requests termination and
/// waits, it cannot abort a partition mid-task. Long-running guest loops
/// are expected to poll the token.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    halt: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        self.halt.load(Ordering::Acquire)
    }
}

/// Partitioned execution host
///
/// Hosts N isolated guest partitions plus one scheduler thread. Each
/// partition gets a dedicated thread running its entry callable; the
/// scheduler grants every partition a bounded run window per round,
/// honoring its configured quota. Partitions communicate only through the
/// hypervisor-mediated inboxes.
///
/// Cheap to clone; all clones share the same host state.
pub struct Hypervisor {
    registry: PartitionRegistry,
    router: MessageRouter,
    stats: Arc<AtomicSchedStats>,
    halt: Arc<AtomicBool>,
    state: Arc<Mutex<Lifecycle>>,
    scheduler_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    partition_handles: Arc<Mutex<Vec<(PartitionId, JoinHandle<()>)>>>,
}

impl Hypervisor {
    pub fn new() -> Self {
        info!("Hypervisor initialized");
        let registry = PartitionRegistry::new();
        Self {
            router: MessageRouter::new(registry.clone()),
            registry,
            stats: Arc::new(AtomicSchedStats::new()),
            halt: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(Lifecycle::Idle)),
            scheduler_handle: Arc::new(Mutex::new(None)),
            partition_handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a new partition before `start()`
    ///
    /// The entry callable receives the partition id on the partition's own
    /// thread and is responsible for building its executor and observing
    /// the shutdown token. Duplicate ids and registration after start are
    /// configuration errors.
    pub fn create_partition(
        &self,
        config: PartitionConfig,
        entry: impl FnOnce(PartitionId) + Send + 'static,
    ) -> HvResult<PartitionId> {
        let state = self.state.lock();
        if *state != Lifecycle::Idle {
            return Err(HypervisorError::RegistrationClosed(config.id));
        }
        self.registry.register(config, Box::new(entry))
    }

    /// Spawn one thread per registered partition plus the scheduler thread
    pub fn start(&self) -> HvResult<()> {
        let mut state = self.state.lock();
        match *state {
            Lifecycle::Idle => {}
            Lifecycle::Running => return Err(HypervisorError::AlreadyStarted),
            Lifecycle::Stopped => return Err(HypervisorError::Halted),
        }

        let partitions = self.registry.snapshot();
        info!("Starting hypervisor with {} partitions", partitions.len());

        let mut handles = self.partition_handles.lock();
        for partition in &partitions {
            let id = partition.id();
            let Some(entry) = partition.take_entry() else {
                warn!("partition {} has no entry callable, skipping", id);
                continue;
            };

            let handle = thread::Builder::new()
                .name(format!("partition-{}", id))
                .spawn(move || {
                    debug!("partition {} entry running", id);
                    entry(id);
                    debug!("partition {} entry returned", id);
                })
                .map_err(|e| HypervisorError::Spawn {
                    thread: format!("partition-{}", id),
                    reason: e.to_string(),
                })?;
            handles.push((id, handle));
        }
        drop(handles);

        let scheduler = Scheduler::new(
            self.registry.clone(),
            Arc::clone(&self.halt),
            Arc::clone(&self.stats),
        );
        let handle = thread::Builder::new()
            .name("scheduler".into())
            .spawn(move || scheduler.run())
            .map_err(|e| HypervisorError::Spawn {
                thread: "scheduler".into(),
                reason: e.to_string(),
            })?;
        *self.scheduler_handle.lock() = Some(handle);

        *state = Lifecycle::Running;
        Ok(())
    }

    /// Signal halt, join the scheduler, then join every partition thread
    ///
    /// Best-effort and cooperative: partition entries observe the shutdown
    /// token; an entry that ignores it keeps its thread alive and `stop()`
    /// waits on it.
    pub fn stop(&self) -> HvResult<()> {
        {
            let mut state = self.state.lock();
            match *state {
                Lifecycle::Running => {}
                Lifecycle::Idle => return Err(HypervisorError::NotRunning),
                Lifecycle::Stopped => return Err(HypervisorError::Halted),
            }
            *state = Lifecycle::Stopped;
        }

        info!("Stopping hypervisor");
        self.halt.store(true, Ordering::Release);

        if let Some(handle) = self.scheduler_handle.lock().take() {
            if handle.join().is_err() {
                warn!("scheduler thread panicked during shutdown");
            }
        }

        // Joining happens outside the handle lock
        let handles: Vec<_> = self.partition_handles.lock().drain(..).collect();
        for (id, handle) in handles {
            if handle.join().is_err() {
                warn!("partition {} thread panicked during shutdown", id);
            }
        }

        info!("Hypervisor stopped");
        Ok(())
    }

    /// Atomically update a live partition's quota; no-op on unknown ids
    ///
    /// The new value takes effect on the partition's next scheduling
    /// round.
    pub fn set_cpu_quota(&self, partition_id: PartitionId, quota_ms: i64) {
        match self.registry.get(partition_id) {
            Some(partition) => {
                partition.set_cpu_quota(quota_ms);
                info!("partition {} quota set to {}ms", partition_id, quota_ms);
            }
            None => debug!("set_cpu_quota: unknown partition {}", partition_id),
        }
    }

    /// Route a message to its destination partition's inbox
    ///
    /// Messages addressed to unknown partitions are silently dropped.
    pub fn send_message(&self, message: Message) {
        self.router.send(message);
    }

    /// Non-blocking pop of the oldest message queued for a partition
    ///
    /// `None` if the inbox is empty or the id is unknown; never an error
    /// and never blocks.
    pub fn try_receive(&self, partition_id: PartitionId) -> Option<Message> {
        self.router.try_receive(partition_id)
    }

    /// Blocking receive with a deadline, woken by `send_message`
    pub fn receive_timeout(&self, partition_id: PartitionId, timeout: Duration) -> Option<Message> {
        self.router.receive_timeout(partition_id, timeout)
    }

    /// Copy-out snapshot of a partition's configuration
    pub fn partition_config(&self, partition_id: PartitionId) -> Option<PartitionConfig> {
        self.registry.get(partition_id).map(|p| p.config())
    }

    pub fn partition_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the partition's advisory run window is currently open
    pub fn is_granted(&self, partition_id: PartitionId) -> bool {
        self.registry
            .get(partition_id)
            .map(|p| p.gate().is_granted())
            .unwrap_or(false)
    }

    /// Wait until the partition's run window opens, up to `timeout`
    ///
    /// Returns false on timeout or unknown id. The window is advisory;
    /// guests may use this to align work with their grant, nothing forces
    /// them to.
    pub fn wait_for_grant(&self, partition_id: PartitionId, timeout: Duration) -> bool {
        self.registry
            .get(partition_id)
            .map(|p| p.gate().wait_granted(timeout))
            .unwrap_or(false)
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }

    /// Token for guest loops to observe `stop()`
    pub fn shutdown_token(&self) -> ShutdownToken {
        ShutdownToken {
            halt: Arc::clone(&self.halt),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock() == Lifecycle::Running
    }
}

impl Clone for Hypervisor {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            router: self.router.clone(),
            stats: Arc::clone(&self.stats),
            halt: Arc::clone(&self.halt),
            state: Arc::clone(&self.state),
            scheduler_handle: Arc::clone(&self.scheduler_handle),
            partition_handles: Arc::clone(&self.partition_handles),
        }
    }
}

impl Default for Hypervisor {
    fn default() -> Self {
        Self::new()
    }
}

/*!
 * Partition Host Library
 * Time-partitioned execution host: a supervising quota scheduler hosting
 * isolated guest partitions that communicate through mediated inboxes
 */

pub mod core;
pub mod executor;
pub mod hypervisor;
pub mod ipc;

// Re-exports
pub use crate::core::errors::{HvResult, HypervisorError};
pub use crate::core::types::{PartitionConfig, PartitionId, TaskId};
pub use executor::{ExecutorHandle, MessageObserver, TaskExecutor, TaskFn, TICK};
pub use hypervisor::{
    Hypervisor, PartitionGrantStats, SchedulerStats, ShutdownToken, DEFAULT_QUOTA,
};
pub use ipc::Message;

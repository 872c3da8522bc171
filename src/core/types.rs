/*!
 * Core Types
 * Common types used across the host
 */

use serde::{Deserialize, Serialize};

/// Partition ID type
pub type PartitionId = u32;

/// Task index within one partition's executor
pub type TaskId = usize;

/// Static configuration of a partition
///
/// Ids are caller-assigned and must be unique within one hypervisor
/// instance. Everything except `cpu_quota_ms` is immutable after
/// registration; the quota is updated through
/// [`Hypervisor::set_cpu_quota`](crate::Hypervisor::set_cpu_quota).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    pub id: PartitionId,
    pub name: String,
    /// Scheduling quota per round, in milliseconds. Non-positive values
    /// resolve to the scheduler default at grant time, not here.
    pub cpu_quota_ms: i64,
    /// Declared memory budget. Advisory only; nothing enforces it.
    pub memory_quota_bytes: usize,
}

impl PartitionConfig {
    pub fn new(id: PartitionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cpu_quota_ms: 0,
            memory_quota_bytes: 0,
        }
    }

    pub fn with_cpu_quota(mut self, quota_ms: i64) -> Self {
        self.cpu_quota_ms = quota_ms;
        self
    }

    pub fn with_memory_quota(mut self, bytes: usize) -> Self {
        self.memory_quota_bytes = bytes;
        self
    }
}

/*!
 * Partition Registry
 * The set of hosted partitions, keyed by unique caller-assigned id
 */

use super::partition::{EntryFn, Partition};
use crate::core::errors::{HvResult, HypervisorError};
use crate::core::types::{PartitionConfig, PartitionId};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

/// Registry of hosted partitions
///
/// Registration order is kept separately from the id index: the scheduler
/// cycles partitions in the order they were registered, while routing and
/// quota updates look partitions up by id without touching the order
/// lock. The order lock is held only briefly per operation and never
/// across a sleep; the scheduler works on a copy-out snapshot.
pub(crate) struct PartitionRegistry {
    order: Arc<RwLock<Vec<Arc<Partition>>>>,
    by_id: Arc<DashMap<PartitionId, Arc<Partition>, RandomState>>,
}

impl PartitionRegistry {
    pub fn new() -> Self {
        Self {
            order: Arc::new(RwLock::new(Vec::new())),
            by_id: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Register a new partition; duplicate ids are rejected
    pub fn register(&self, config: PartitionConfig, entry: EntryFn) -> HvResult<PartitionId> {
        let id = config.id;
        match self.by_id.entry(id) {
            Entry::Occupied(_) => Err(HypervisorError::DuplicatePartition(id)),
            Entry::Vacant(slot) => {
                info!(
                    "Registered partition {} ('{}', quota: {}ms, memory budget: {} bytes)",
                    id, config.name, config.cpu_quota_ms, config.memory_quota_bytes
                );
                let partition = Arc::new(Partition::new(config, entry));
                slot.insert(Arc::clone(&partition));
                self.order.write().push(partition);
                Ok(id)
            }
        }
    }

    /// Look up a partition by id
    pub fn get(&self, id: PartitionId) -> Option<Arc<Partition>> {
        self.by_id.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Copy-out snapshot of all partitions in registration order
    pub fn snapshot(&self) -> Vec<Arc<Partition>> {
        self.order.read().clone()
    }

    pub fn len(&self) -> usize {
        self.order.read().len()
    }
}

impl Clone for PartitionRegistry {
    fn clone(&self) -> Self {
        Self {
            order: Arc::clone(&self.order),
            by_id: Arc::clone(&self.by_id),
        }
    }
}

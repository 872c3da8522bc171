/*!
 * Message Router
 * Delivers messages to the addressed partition's inbox
 */

use super::message::Message;
use crate::core::types::PartitionId;
use crate::hypervisor::registry::PartitionRegistry;
use log::debug;
use std::time::Duration;

/// Routes messages between partitions by destination id
///
/// Partitions pull from their own inbox, never another's. An unknown
/// destination drops the message without error: routing to a partition
/// that does not exist is a benign race during shutdown, not a fault.
pub(crate) struct MessageRouter {
    registry: PartitionRegistry,
}

impl MessageRouter {
    pub fn new(registry: PartitionRegistry) -> Self {
        Self { registry }
    }

    /// Deliver a message to its destination inbox, waking any waiter
    pub fn send(&self, message: Message) {
        match self.registry.get(message.to_partition) {
            Some(partition) => partition.inbox().push(message),
            None => debug!(
                "dropping message from {} to unknown partition {}",
                message.from_partition, message.to_partition
            ),
        }
    }

    /// Non-blocking pop of the oldest message queued for a partition
    pub fn try_receive(&self, partition_id: PartitionId) -> Option<Message> {
        self.registry.get(partition_id)?.inbox().try_pop()
    }

    /// Blocking pop with a deadline, woken by `send`
    pub fn receive_timeout(&self, partition_id: PartitionId, timeout: Duration) -> Option<Message> {
        self.registry.get(partition_id)?.inbox().pop_timeout(timeout)
    }
}

impl Clone for MessageRouter {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

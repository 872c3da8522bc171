/*!
 * Message Type
 * Immutable value object routed between partitions
 */

use crate::core::types::PartitionId;
use serde::{Deserialize, Serialize};

/// Inter-partition message
///
/// Value type: copied on send, ownership transfers into the destination
/// inbox on delivery. The payload is opaque to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from_partition: PartitionId,
    pub to_partition: PartitionId,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(
        from_partition: PartitionId,
        to_partition: PartitionId,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            from_partition,
            to_partition,
            payload: payload.into(),
        }
    }

    pub fn size(&self) -> usize {
        std::mem::size_of::<Self>() + self.payload.len()
    }
}

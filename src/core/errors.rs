/*!
 * Error Types
 * Centralized error handling with thiserror and serde support
 */

use super::types::PartitionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for hypervisor control-surface operations
pub type HvResult<T> = Result<T, HypervisorError>;

/// Hypervisor errors with serialization support
///
/// Routing to an unknown partition is deliberately NOT represented here:
/// it is a benign race during shutdown and the routing surface reports it
/// as an absent value instead.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HypervisorError {
    #[error("partition {0} is already registered")]
    DuplicatePartition(PartitionId),

    #[error("partition {0} cannot be registered after start")]
    RegistrationClosed(PartitionId),

    #[error("hypervisor is already running")]
    AlreadyStarted,

    #[error("hypervisor is not running")]
    NotRunning,

    #[error("hypervisor has already been stopped")]
    Halted,

    #[error("failed to spawn {thread} thread: {reason}")]
    Spawn { thread: String, reason: String },
}

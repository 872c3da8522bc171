/*!
 * IPC Module
 * Inter-partition messaging: message type, per-partition inbox, router
 */

pub(crate) mod inbox;
pub mod message;
pub(crate) mod router;

pub use message::Message;

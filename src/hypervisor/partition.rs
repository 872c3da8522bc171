/*!
 * Partition
 * A named unit of isolation with a quota, an inbox, and a run gate
 */

use super::scheduler::DEFAULT_QUOTA;
use crate::core::types::{PartitionConfig, PartitionId};
use crate::ipc::inbox::Inbox;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Entry callable executed by the partition's thread
///
/// The hypervisor does not own the callback's captured state; the
/// collaborator must ensure it outlives the partition's thread.
pub(crate) type EntryFn = Box<dyn FnOnce(PartitionId) + Send + 'static>;

/// Run-permission gate
///
/// The scheduler opens and closes the gate to communicate an intended
/// scheduling window. It is advisory: nothing preempts a guest that keeps
/// running with the gate closed, and the contract is a minimum guaranteed
/// window, not a hard CPU cap.
pub(crate) struct RunGate {
    granted: Mutex<bool>,
    granted_cv: Condvar,
}

impl RunGate {
    fn new() -> Self {
        Self {
            granted: Mutex::new(false),
            granted_cv: Condvar::new(),
        }
    }

    /// Open the window and wake all waiters
    pub fn grant(&self) {
        let mut granted = self.granted.lock();
        *granted = true;
        self.granted_cv.notify_all();
    }

    /// Close the window
    pub fn revoke(&self) {
        *self.granted.lock() = false;
    }

    pub fn is_granted(&self) -> bool {
        *self.granted.lock()
    }

    /// Wait until the gate is open, up to `timeout`
    ///
    /// Returns whether the gate was open when the wait ended.
    pub fn wait_granted(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut granted = self.granted.lock();
        while !*granted {
            if self.granted_cv.wait_until(&mut granted, deadline).timed_out() {
                return *granted;
            }
        }
        true
    }
}

/// A hosted guest context, owned exclusively by the hypervisor
///
/// Exactly one thread executes the entry callable for the partition's
/// entire lifetime. Identity and the memory budget are immutable after
/// registration; only the CPU quota can be updated.
pub(crate) struct Partition {
    id: PartitionId,
    name: String,
    memory_quota_bytes: usize,
    cpu_quota_ms: AtomicI64,
    entry: Mutex<Option<EntryFn>>,
    gate: RunGate,
    inbox: Inbox,
}

impl Partition {
    pub fn new(config: PartitionConfig, entry: EntryFn) -> Self {
        Self {
            id: config.id,
            name: config.name,
            memory_quota_bytes: config.memory_quota_bytes,
            cpu_quota_ms: AtomicI64::new(config.cpu_quota_ms),
            entry: Mutex::new(Some(entry)),
            gate: RunGate::new(),
            inbox: Inbox::new(),
        }
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy-out snapshot of the current configuration
    pub fn config(&self) -> PartitionConfig {
        PartitionConfig {
            id: self.id,
            name: self.name.clone(),
            cpu_quota_ms: self.cpu_quota_ms.load(Ordering::Acquire),
            memory_quota_bytes: self.memory_quota_bytes,
        }
    }

    pub fn set_cpu_quota(&self, quota_ms: i64) {
        self.cpu_quota_ms.store(quota_ms, Ordering::Release);
    }

    /// Resolve the effective scheduling window
    ///
    /// Non-positive quotas fall back to the default here, at grant time: a
    /// partition configured with quota 0 picks up a later update on its
    /// next scheduling round.
    pub fn effective_quota(&self) -> Duration {
        let quota_ms = self.cpu_quota_ms.load(Ordering::Acquire);
        if quota_ms > 0 {
            Duration::from_millis(quota_ms as u64)
        } else {
            DEFAULT_QUOTA
        }
    }

    /// Take the entry callable; yields `Some` exactly once
    pub fn take_entry(&self) -> Option<EntryFn> {
        self.entry.lock().take()
    }

    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn partition(quota_ms: i64) -> Partition {
        let config = PartitionConfig::new(1, "guest").with_cpu_quota(quota_ms);
        Partition::new(config, Box::new(|_| {}))
    }

    #[test]
    fn test_effective_quota_resolves_default_at_grant_time() {
        let p = partition(0);
        assert_eq!(p.effective_quota(), DEFAULT_QUOTA);

        // A later update is picked up on the next resolution
        p.set_cpu_quota(25);
        assert_eq!(p.effective_quota(), Duration::from_millis(25));

        p.set_cpu_quota(-5);
        assert_eq!(p.effective_quota(), DEFAULT_QUOTA);
    }

    #[test]
    fn test_entry_taken_once() {
        let p = partition(10);
        assert!(p.take_entry().is_some());
        assert!(p.take_entry().is_none());
    }

    #[test]
    fn test_gate_grant_revoke() {
        let p = partition(10);
        assert!(!p.gate().is_granted());
        p.gate().grant();
        assert!(p.gate().is_granted());
        p.gate().revoke();
        assert!(!p.gate().is_granted());
    }

    #[test]
    fn test_gate_wait_times_out_closed() {
        let p = partition(10);
        assert!(!p.gate().wait_granted(Duration::from_millis(20)));
    }

    #[test]
    fn test_gate_wait_woken_by_grant() {
        let p = Arc::new(partition(10));
        let granter = Arc::clone(&p);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            granter.gate().grant();
        });

        assert!(p.gate().wait_granted(Duration::from_secs(1)));
        handle.join().unwrap();
    }
}

/*!
 * Partition Inbox
 * FIFO message queue with condvar wakeup for blocking receivers
 */

use super::message::Message;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Per-partition FIFO inbox
///
/// Delivery is serialized by the inbox lock: concurrent senders to the
/// same partition are ordered by lock acquisition, and messages from one
/// sender keep their send order. The queue is unbounded; a send to a live
/// partition always appends.
pub(crate) struct Inbox {
    queue: Mutex<VecDeque<Message>>,
    available: Condvar,
}

impl Inbox {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Append a message and wake one waiter
    pub fn push(&self, message: Message) {
        let mut queue = self.queue.lock();
        queue.push_back(message);
        self.available.notify_one();
    }

    /// Non-blocking pop of the oldest message
    pub fn try_pop(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    /// Pop the oldest message, waiting up to `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.queue.lock();
        loop {
            if let Some(message) = queue.pop_front() {
                return Some(message);
            }
            if self.available.wait_until(&mut queue, deadline).timed_out() {
                return queue.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/*!
 * Routing Tests
 * Inter-partition delivery, ordering guarantees, and the drop policy
 */

use partition_host::{Hypervisor, Message, PartitionConfig};
use pretty_assertions::assert_eq;
use std::thread;
use std::time::{Duration, Instant};

fn host_with_partitions(ids: &[u32]) -> Hypervisor {
    let hv = Hypervisor::new();
    for &id in ids {
        let config = PartitionConfig::new(id, format!("guest-{}", id)).with_cpu_quota(10);
        hv.create_partition(config, |_| {}).unwrap();
    }
    hv
}

#[test]
fn test_fifo_per_sender() {
    let hv = host_with_partitions(&[1, 2]);

    hv.send_message(Message::new(1, 2, "m1"));
    hv.send_message(Message::new(1, 2, "m2"));

    assert_eq!(hv.try_receive(2).unwrap().payload, b"m1");
    assert_eq!(hv.try_receive(2).unwrap().payload, b"m2");
    assert!(hv.try_receive(2).is_none());
}

#[test]
fn test_no_cross_delivery() {
    let hv = host_with_partitions(&[1, 2]);

    hv.send_message(Message::new(1, 2, "for-two"));

    // Only the addressed partition ever observes the message
    assert!(hv.try_receive(1).is_none());
    let received = hv.try_receive(2).unwrap();
    assert_eq!(received.payload, b"for-two");
    assert_eq!(received.from_partition, 1);
}

#[test]
fn test_drop_on_unknown_destination() {
    let hv = host_with_partitions(&[1, 2]);

    // No error, no effect on existing inboxes
    hv.send_message(Message::new(1, 99, "lost"));

    assert!(hv.try_receive(1).is_none());
    assert!(hv.try_receive(2).is_none());
    assert!(hv.try_receive(99).is_none());
}

#[test]
fn test_try_receive_empty_returns_none() {
    let hv = host_with_partitions(&[1]);
    assert!(hv.try_receive(1).is_none());
}

#[test]
fn test_try_receive_unknown_never_blocks() {
    let hv = host_with_partitions(&[1]);

    let start = Instant::now();
    for _ in 0..100 {
        assert!(hv.try_receive(99).is_none());
    }
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_receive_timeout_expires() {
    let hv = host_with_partitions(&[1]);

    let start = Instant::now();
    assert!(hv.receive_timeout(1, Duration::from_millis(50)).is_none());
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_receive_timeout_woken_by_send() {
    let hv = host_with_partitions(&[1, 2]);

    let sender = hv.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        sender.send_message(Message::new(1, 2, "wake"));
    });

    let received = hv.receive_timeout(2, Duration::from_secs(1)).unwrap();
    assert_eq!(received.payload, b"wake");
    handle.join().unwrap();
}

#[test]
fn test_receive_timeout_unknown_partition() {
    let hv = host_with_partitions(&[1]);
    assert!(hv.receive_timeout(99, Duration::from_millis(10)).is_none());
}

#[test]
fn test_concurrent_senders_keep_per_sender_order() {
    const PER_SENDER: usize = 50;

    let hv = host_with_partitions(&[1, 2, 3]);

    let senders: Vec<_> = [1u32, 2]
        .into_iter()
        .map(|from| {
            let hv = hv.clone();
            thread::spawn(move || {
                for i in 0..PER_SENDER {
                    hv.send_message(Message::new(from, 3, format!("{}-{}", from, i)));
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    let mut received = Vec::new();
    while let Some(message) = hv.try_receive(3) {
        received.push(message);
    }
    assert_eq!(received.len(), 2 * PER_SENDER);

    // Interleaving across senders is unspecified; order within one sender
    // is not
    for from in [1u32, 2] {
        let payloads: Vec<_> = received
            .iter()
            .filter(|m| m.from_partition == from)
            .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
            .collect();
        let expected: Vec<_> = (0..PER_SENDER).map(|i| format!("{}-{}", from, i)).collect();
        assert_eq!(payloads, expected);
    }
}

/*!
 * Partition Host Demo
 * Two guest partitions exchanging heartbeats under time partitioning
 */

use log::info;
use partition_host::{Hypervisor, Message, PartitionConfig, PartitionId, TaskExecutor};
use std::thread;
use std::time::Duration;

fn guest_main(hv: &Hypervisor, pid: PartitionId) {
    let mut executor = TaskExecutor::new(hv, pid);

    let sender = hv.clone();
    let mut beats = 0u64;
    executor.create_task(
        "heartbeat",
        move || {
            beats += 1;
            info!("partition {}: heartbeat {}", pid, beats);
            // Ping the peer occasionally
            if pid == 1 && beats % 5 == 0 {
                sender.send_message(Message::new(1, 2, "ping"));
            }
            if pid == 2 && beats % 7 == 0 {
                sender.send_message(Message::new(2, 1, "pong"));
            }
        },
        Duration::from_millis(100),
    );

    executor.create_task(
        "fast",
        move || {
            // Busy work to demonstrate scheduling fairness
            let mut acc = 0u64;
            for i in 0..10_000u64 {
                acc = acc.wrapping_add(i);
            }
            std::hint::black_box(acc);
        },
        Duration::from_millis(40),
    );

    executor.on_message(move |m: Message| {
        info!(
            "partition {}: received '{}' from partition {}",
            pid,
            String::from_utf8_lossy(&m.payload),
            m.from_partition
        );
    });

    executor.start();
}

fn main() {
    env_logger::init();

    let hv = Hypervisor::new();

    let configs = [
        PartitionConfig::new(1, "guest-a")
            .with_cpu_quota(30)
            .with_memory_quota(1024 * 1024),
        PartitionConfig::new(2, "guest-b")
            .with_cpu_quota(20)
            .with_memory_quota(1024 * 1024),
    ];

    for config in configs {
        let guest_hv = hv.clone();
        hv.create_partition(config, move |pid| guest_main(&guest_hv, pid))
            .expect("partition registration failed");
    }

    hv.start().expect("hypervisor failed to start");

    thread::sleep(Duration::from_secs(6));

    info!("Changing CPU quotas: give more time to partition 2");
    hv.set_cpu_quota(2, 50);

    thread::sleep(Duration::from_secs(6));

    hv.stop().expect("hypervisor failed to stop");

    match serde_json::to_string_pretty(&hv.scheduler_stats()) {
        Ok(stats) => println!("{}", stats),
        Err(e) => eprintln!("failed to serialize stats: {}", e),
    }
}

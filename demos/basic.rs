//! Basic scheduler walkthrough
//!
//! Demonstrates:
//! - Delayed and immediate task execution
//! - Group tagging and bulk cancellation
//! - Error handling for panicking runnables
//! - Snapshot diagnostics

use std::time::Duration;
use tickq::prelude::*;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("tickq=debug,basic=info")
        .init();

    println!("=== tickq Scheduler Example ===\n");

    let scheduler: Scheduler<String> = Scheduler::builder()
        .with_tick_interval(Duration::from_secs(1))
        .with_error_handler(|failure| eprintln!("[error handler] {failure}"))
        .build();
    scheduler.start();

    println!("Scheduler started. Scheduling tasks...\n");

    // An already-due task runs immediately, without waiting for a tick.
    scheduler.schedule(TaskRequest::after(Duration::ZERO, || {
        println!("[immediate] ran before the first tick");
    }));

    // A staggered batch under overlapping groups, like a burst of game or
    // activity timers.
    for i in 1..=4_u64 {
        let delay = Duration::from_secs(i);
        scheduler.schedule(
            TaskRequest::after(delay, move || {
                println!("[activity:{i}] fired after {i}s");
            })
            .group("activity".to_string())
            .group(format!("activity:{i}")),
        );
    }

    // A task that panics: the error handler sees it, the scheduler shrugs.
    scheduler.schedule(
        TaskRequest::after(Duration::from_secs(2), || {
            panic!("simulated task failure");
        })
        .group("activity".to_string()),
    );

    // Cancel one slice of the cohort before it fires.
    let cancelled = scheduler.cancel_group(&"activity:3".to_string());
    println!("Cancelled {} task(s) in group activity:3\n", cancelled.len());

    for _ in 0..5 {
        let snapshot = scheduler.snapshot();
        println!(
            "snapshot: {} pending across {} groups: {:?}",
            snapshot.pending_tasks, snapshot.group_count, snapshot.group_counts
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    scheduler.stop();
    println!("\nScheduler stopped.");
}

//! Inspect command implementation.

use super::{format_millis, CliQueue};
use offsync_queue::{QueueStats, SyncType};
use serde::Serialize;
use std::path::Path;

/// Queue inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Storage key of the snapshot.
    pub storage_key: String,
    /// Queue statistics.
    pub stats: QueueStats,
}

/// Runs the inspect command.
pub fn run(queue: &CliQueue, path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = InspectResult {
        path: path.display().to_string(),
        storage_key: queue.config().storage_key.clone(),
        stats: queue.stats(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    let stats = &result.stats;

    println!("Queue: {} ({})", result.path, result.storage_key);
    println!();
    println!("Payloads:");
    println!("  Total:       {}", stats.total);
    println!("  Ready:       {}", stats.ready);
    println!("  Backing off: {}", stats.backing_off);
    println!("  Failed:      {}", stats.failed_items);
    println!("  Avg retries: {:.2}", stats.average_retry_count);
    println!("  Oldest:      {}", format_millis(stats.oldest_created_at));

    if stats.total > 0 {
        println!();
        println!("By type:");
        for sync_type in SyncType::ALL {
            println!("  {:<8} {}", sync_type.as_str(), stats.count_of(sync_type));
        }
        println!();
        println!("By priority:");
        for (priority, count) in &stats.by_priority {
            println!("  {:<8} {}", priority, count);
        }
    }
}

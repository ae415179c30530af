//! List command implementation.

use super::{format_millis, CliQueue};
use offsync_queue::{SyncPayload, SyncType};

/// Runs the list command.
pub fn run(queue: &CliQueue, sync_type: Option<SyncType>, failed_only: bool) {
    let rows = select(queue.items(), sync_type, failed_only);

    if rows.is_empty() {
        println!("No matching payloads");
        return;
    }

    println!(
        "{:<36}  {:<7}  {:>3}  {:>7}  {:<14}  error",
        "id", "type", "pri", "retries", "next retry"
    );
    for item in rows {
        println!(
            "{:<36}  {:<7}  {:>3}  {:>3}/{:<3}  {:<14}  {}",
            item.id,
            item.sync_type.as_str(),
            item.priority,
            item.retry_count,
            item.max_retries,
            format_millis(item.next_retry_at),
            item.error.as_deref().unwrap_or("")
        );
    }
}

fn select(
    items: &[SyncPayload],
    sync_type: Option<SyncType>,
    failed_only: bool,
) -> Vec<&SyncPayload> {
    items
        .iter()
        .filter(|item| match sync_type {
            Some(t) => item.sync_type == t,
            None => true,
        })
        .filter(|item| !failed_only || item.is_exhausted())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsync_queue::{MenuRefresh, PersistentQueue, QueueConfig};
    use offsync_storage::InMemoryStore;

    fn menu(venue: &str) -> MenuRefresh {
        MenuRefresh {
            venue_id: venue.to_string(),
            date: "2026-03-01".to_string(),
        }
    }

    #[test]
    fn filters_by_failure() {
        let mut queue = PersistentQueue::open(InMemoryStore::new(), QueueConfig::default()).unwrap();
        let a = queue.add(menu("a").into(), 4, 2).unwrap();
        queue.add(menu("b").into(), 4, 2).unwrap();
        queue.mark_exhausted(&a, "gone").unwrap();

        let failed = select(queue.items(), None, true);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, a);

        assert_eq!(select(queue.items(), Some(SyncType::Menu), false).len(), 2);
        assert!(select(queue.items(), Some(SyncType::Photo), false).is_empty());
    }
}

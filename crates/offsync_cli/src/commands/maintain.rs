//! Queue maintenance commands.

use super::CliQueue;
use offsync_queue::{PayloadId, QueueError, SyncType};

/// Removes every payload that ran out of retries.
pub fn purge_failed(queue: &mut CliQueue) -> Result<(), Box<dyn std::error::Error>> {
    let removed = queue.remove_failed()?;
    println!("Removed {} failed payloads", removed);
    Ok(())
}

/// Resets the retry budget of `id` so it becomes ready again.
pub fn retry(queue: &mut CliQueue, id: &PayloadId) -> Result<(), Box<dyn std::error::Error>> {
    if !queue.reset_retries(id)? {
        return Err(QueueError::NotFound(id.to_string()).into());
    }
    println!("Payload {} is ready for retry", id);
    Ok(())
}

/// Removes all payloads, or only those of `sync_type`.
pub fn clear(
    queue: &mut CliQueue,
    sync_type: Option<SyncType>,
) -> Result<(), Box<dyn std::error::Error>> {
    match sync_type {
        Some(t) => {
            let removed = queue.clear_by_type(t)?;
            println!("Removed {} {} payloads", removed, t);
        }
        None => {
            let removed = queue.len();
            queue.clear()?;
            println!("Removed {} payloads", removed);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_queue;
    use offsync_queue::MenuRefresh;
    use tempfile::TempDir;

    fn menu() -> MenuRefresh {
        MenuRefresh {
            venue_id: "north".to_string(),
            date: "2026-03-01".to_string(),
        }
    }

    #[test]
    fn retry_makes_failed_payload_ready() {
        let dir = TempDir::new().unwrap();
        let mut queue = open_queue(dir.path(), "sync_queue").unwrap();
        let id = queue.add(menu().into(), 4, 1).unwrap();
        queue.mark_exhausted(&id, "rejected").unwrap();
        assert!(queue.get_ready().is_empty());

        retry(&mut queue, &id).unwrap();
        assert_eq!(queue.get_ready().len(), 1);
        let missing = PayloadId::new();
        let err = retry(&mut queue, &missing).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::NotFound(id)) if *id == missing.to_string()
        ));
    }

    #[test]
    fn purge_and_clear_persist() {
        let dir = TempDir::new().unwrap();
        {
            let mut queue = open_queue(dir.path(), "sync_queue").unwrap();
            let id = queue.add(menu().into(), 4, 1).unwrap();
            queue.add(menu().into(), 4, 1).unwrap();
            queue.mark_exhausted(&id, "rejected").unwrap();
            purge_failed(&mut queue).unwrap();
        }

        let mut queue = open_queue(dir.path(), "sync_queue").unwrap();
        assert_eq!(queue.len(), 1);
        clear(&mut queue, Some(SyncType::Photo)).unwrap();
        assert_eq!(queue.len(), 1);
        clear(&mut queue, None).unwrap();
        assert!(queue.is_empty());
    }
}

//! Export and import commands.

use super::CliQueue;
use std::fs;
use std::path::Path;
use tracing::info;

/// Writes the queue as JSON to `output`, or stdout.
pub fn export(queue: &CliQueue, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = queue.export()?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            info!(count = queue.len(), path = %path.display(), "exported queue");
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Replaces the queue with the export stored at `input`.
pub fn import(queue: &mut CliQueue, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = fs::read_to_string(input)?;
    let count = queue.import(&json)?;
    println!("Imported {} payloads", count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_queue;
    use offsync_queue::MenuRefresh;
    use tempfile::TempDir;

    #[test]
    fn export_then_import_between_stores() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let file = source_dir.path().join("queue.json");

        let mut source = open_queue(source_dir.path(), "sync_queue").unwrap();
        source
            .add(
                MenuRefresh {
                    venue_id: "north".to_string(),
                    date: "2026-03-01".to_string(),
                }
                .into(),
                4,
                2,
            )
            .unwrap();
        export(&source, Some(&file)).unwrap();

        let mut target = open_queue(target_dir.path(), "sync_queue").unwrap();
        import(&mut target, &file).unwrap();
        assert_eq!(target.items(), source.items());
    }
}

//! Snapshot encoding.
//!
//! The durable blob is CBOR of `{version, items}`; exports use the same
//! structure as pretty JSON so they can be read and edited by hand.

use crate::error::{QueueError, QueueResult};
use crate::payload::{clamp_priority, SyncPayload};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    items: &'a [SyncPayload],
}

#[derive(Deserialize)]
struct SnapshotHeader {
    version: u32,
}

#[derive(Deserialize)]
struct Snapshot {
    items: Vec<SyncPayload>,
}

/// Encodes the queue contents for the durable store.
pub fn encode_snapshot(items: &[SyncPayload]) -> QueueResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(
        &SnapshotRef {
            version: SNAPSHOT_VERSION,
            items,
        },
        &mut bytes,
    )
    .map_err(|e| QueueError::Codec(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a durable snapshot, dropping payloads that fail sanity checks.
pub fn decode_snapshot(bytes: &[u8]) -> QueueResult<Vec<SyncPayload>> {
    let header: SnapshotHeader =
        ciborium::de::from_reader(bytes).map_err(|e| QueueError::Codec(e.to_string()))?;
    check_version(header.version)?;

    let snapshot: Snapshot =
        ciborium::de::from_reader(bytes).map_err(|e| QueueError::Codec(e.to_string()))?;
    Ok(sanitize(snapshot.items))
}

/// Encodes the queue contents as pretty JSON.
pub fn export_json(items: &[SyncPayload]) -> QueueResult<String> {
    serde_json::to_string_pretty(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        items,
    })
    .map_err(|e| QueueError::Codec(e.to_string()))
}

/// Decodes a JSON export, dropping payloads that fail sanity checks.
pub fn import_json(json: &str) -> QueueResult<Vec<SyncPayload>> {
    let header: SnapshotHeader =
        serde_json::from_str(json).map_err(|e| QueueError::Codec(e.to_string()))?;
    check_version(header.version)?;

    let snapshot: Snapshot =
        serde_json::from_str(json).map_err(|e| QueueError::Codec(e.to_string()))?;
    Ok(sanitize(snapshot.items))
}

fn check_version(found: u32) -> QueueResult<()> {
    if found == SNAPSHOT_VERSION {
        Ok(())
    } else {
        Err(QueueError::UnsupportedVersion {
            found,
            expected: SNAPSHOT_VERSION,
        })
    }
}

/// Re-establishes payload invariants on data read back from outside.
///
/// Payloads whose declared type disagrees with their data are dropped;
/// priorities are clamped and retry counts capped at the budget.
fn sanitize(items: Vec<SyncPayload>) -> Vec<SyncPayload> {
    items
        .into_iter()
        .filter_map(|mut item| {
            if item.sync_type != item.data.sync_type() {
                warn!(
                    id = %item.id,
                    declared = %item.sync_type,
                    actual = %item.data.sync_type(),
                    "dropping payload with mismatched type"
                );
                return None;
            }
            item.priority = clamp_priority(item.priority);
            item.retry_count = item.retry_count.min(item.max_retries);
            if item.is_exhausted() {
                item.next_retry_at = None;
            }
            Some(item)
        })
        .collect()
}

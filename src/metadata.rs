//! Metadata artifact persistence
//!
//! Serializes the normalized [`PostRecord`] to a single `post.json` file in
//! the placed item directory. Skipped entirely when the media-only policy is
//! active; the orchestrator still performs placement in that mode.

use crate::error::ItemError;
use crate::types::PostRecord;
use std::path::Path;

/// File name of the per-item metadata artifact
pub const METADATA_FILE_NAME: &str = "post.json";

/// Write the record as pretty-printed JSON into `dir`
///
/// # Errors
///
/// Returns [`ItemError::WriteFailed`] carrying the record's real permalink
/// if serialization or the file write fails.
pub async fn write_record(dir: &Path, record: &PostRecord) -> Result<(), ItemError> {
    let path = dir.join(METADATA_FILE_NAME);

    let write_failed = |reason: String| ItemError::WriteFailed {
        id: record.id.clone(),
        path: path.clone(),
        reason,
        permalink: record.permalink.clone(),
    };

    let json = serde_json::to_vec_pretty(record).map_err(|e| write_failed(e.to_string()))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| write_failed(e.to_string()))?;

    tracing::debug!(id = %record.id, path = %path.display(), "Wrote metadata artifact");
    Ok(())
}

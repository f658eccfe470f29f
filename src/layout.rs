//! Archive directory layout
//!
//! Derives the per-item output directory from the placement decision and
//! creates it (and all parents). Creation is idempotent; calling twice with
//! the same inputs is a no-op the second time. `Skip` never reaches this
//! module — the orchestrator short-circuits first.

use crate::error::ItemError;
use crate::types::{Placement, PostRecord};
use std::path::{Path, PathBuf};

/// Subdirectory that alternate-saved removed content lands under
pub const DELETED_SUBDIR: &str = "deleted";

/// Subdirectory the external downloader populates inside an item directory
pub const CONTENT_SUBDIR: &str = "content";

/// Derive the item directory for a record without touching the filesystem
///
/// `<output-root>/<subreddit>/<id>` for [`Placement::Normal`],
/// `<output-root>/deleted/<subreddit>/<id>` for [`Placement::Alternate`].
/// Returns `None` for [`Placement::Skip`].
pub fn item_dir(output_root: &Path, placement: &Placement, record: &PostRecord) -> Option<PathBuf> {
    match placement {
        Placement::Normal => Some(
            output_root
                .join(&record.subreddit)
                .join(record.id.as_str()),
        ),
        Placement::Alternate => Some(
            output_root
                .join(DELETED_SUBDIR)
                .join(&record.subreddit)
                .join(record.id.as_str()),
        ),
        Placement::Skip => None,
    }
}

/// Ensure the item directory exists, creating parents as needed
///
/// # Errors
///
/// Returns [`ItemError::PlacementFailed`] carrying the record's real
/// permalink if the directory cannot be created.
pub async fn place(
    output_root: &Path,
    placement: &Placement,
    record: &PostRecord,
) -> Result<Option<PathBuf>, ItemError> {
    let Some(dir) = item_dir(output_root, placement, record) else {
        return Ok(None);
    };

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ItemError::PlacementFailed {
            id: record.id.clone(),
            path: dir.clone(),
            reason: e.to_string(),
            permalink: record.permalink.clone(),
        })?;

    Ok(Some(dir))
}

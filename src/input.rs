//! Batch input file parsing
//!
//! The batch input is UTF-8 delimited text: a header row (always skipped),
//! optional comment lines introduced by a configurable marker, optional
//! blank lines, and data rows whose first column is the submission
//! identifier. Remaining columns are ignored, which lets a previous run's
//! failure ledger (`id,permalink`) be fed straight back in as input.

use crate::error::{Error, Result};
use crate::types::PostId;
use std::path::Path;

/// Load the ordered batch of identifiers from a delimited input file
///
/// The returned sequence is materialized eagerly and preserves file order.
///
/// # Errors
///
/// - [`Error::InputNotFound`] if `path` does not exist
/// - [`Error::MalformedInput`] if any data row has a blank identifier
///   column; the entire load fails, nothing partial is returned
pub async fn load_batch(path: &Path, comment_marker: char) -> Result<Vec<PostId>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let mut ids = Vec::new();
    let mut header_seen = false;

    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(comment_marker) {
            continue;
        }
        // The first non-comment, non-blank line is the header row.
        if !header_seen {
            header_seen = true;
            continue;
        }

        let first_column = trimmed.split(',').next().unwrap_or("").trim();
        if first_column.is_empty() {
            return Err(Error::MalformedInput {
                path: path.to_path_buf(),
                line: index + 1,
                message: "empty identifier column".to_string(),
            });
        }
        ids.push(PostId::new(first_column));
    }

    tracing::debug!(
        path = %path.display(),
        count = ids.len(),
        "Loaded batch input"
    );
    Ok(ids)
}

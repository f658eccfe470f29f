//! Persistent failure ledger
//!
//! Every identifier that fails at any pipeline stage is accumulated here as
//! an `(id, permalink)` pair. At batch end the run's failures are unioned
//! with any ledger already persisted at the output root and the union is
//! written back, replacing the prior file. The merged file can be fed
//! straight back in as a batch input for retry.
//!
//! The merge is duplicate-free (keyed by identifier) and idempotent: output
//! rows are sorted by identifier, so merging the same two inputs yields the
//! same bytes regardless of order. When the same identifier appears in both
//! inputs with different permalinks, the current run's permalink wins.

use crate::error::Result;
use crate::types::PostId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the failure ledger at the output root
pub const LEDGER_FILE_NAME: &str = "failed.csv";

const LEDGER_HEADER: &str = "id,permalink";

/// In-run accumulator of failed identifiers
#[derive(Debug, Default)]
pub struct FailureLedger {
    failures: BTreeMap<PostId, String>,
}

impl FailureLedger {
    /// Create an empty ledger for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failed identifier with the permalink to retry it from
    ///
    /// Recording the same identifier twice keeps the latest permalink.
    pub fn record(&mut self, id: PostId, permalink: String) {
        self.failures.insert(id, permalink);
    }

    /// Number of distinct failed identifiers recorded this run
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no failures have been recorded this run
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Merge with any pre-existing ledger at `output_root` and persist
    ///
    /// A missing prior file is tolerated. Returns the path of the written
    /// ledger. The file is fully rewritten, never appended.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the prior file exists but cannot be read, or
    /// the merged file cannot be written.
    pub async fn finalize(&self, output_root: &Path) -> Result<PathBuf> {
        let path = output_root.join(LEDGER_FILE_NAME);

        let mut merged = read_existing(&path).await?;
        for (id, permalink) in &self.failures {
            merged.insert(id.clone(), permalink.clone());
        }

        let mut contents = String::from(LEDGER_HEADER);
        contents.push('\n');
        for (id, permalink) in &merged {
            contents.push_str(id.as_str());
            contents.push(',');
            contents.push_str(permalink);
            contents.push('\n');
        }

        tokio::fs::create_dir_all(output_root).await?;
        tokio::fs::write(&path, contents).await?;

        tracing::info!(
            path = %path.display(),
            run_failures = self.failures.len(),
            total = merged.len(),
            "Persisted failure ledger"
        );
        Ok(path)
    }
}

/// Read a previously persisted ledger, tolerating its absence
async fn read_existing(path: &Path) -> Result<BTreeMap<PostId, String>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = BTreeMap::new();
    // Skip the header row; tolerate blank trailing lines.
    for line in contents.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (id, permalink) = line.split_once(',').unwrap_or((line, ""));
        entries.insert(PostId::new(id), permalink.to_string());
    }
    Ok(entries)
}

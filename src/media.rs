//! Media retrieval delegation
//!
//! Bulk media is not fetched by this crate. It is delegated to an external
//! downloader binary invoked as a detached subprocess against the item's
//! source URL, writing under the item's `content/` subdirectory. The
//! [`MediaDownloader`] trait makes the delegation pluggable: a CLI
//! implementation for real use, a no-op for graceful degradation when no
//! binary is available, and stubs in tests.
//!
//! The launch is modeled as a [`DetachedFetch`] handle. The orchestrator
//! drops the handle without waiting — "downloaded" means delegation
//! succeeded, not that media retrieval completed — but the handle exposes
//! `wait()` so a future version can observe the subprocess exit status
//! without changing the call-site contract.
//!
//! Thumbnails are the one piece of media fetched directly: a streamed HTTP
//! download to `thumbnail.jpg`, attempted only when the record's thumbnail
//! field is a resolvable http(s) URL (Reddit uses sentinel strings like
//! "self" and "default" otherwise). Thumbnail failures are swallowed; they
//! never fail the item.

use crate::error::{Error, Result};
use crate::layout::CONTENT_SUBDIR;
use crate::types::PostRecord;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use url::Url;

/// File name of the per-item thumbnail artifact
pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";

/// Default external downloader binary searched for on PATH
pub const DEFAULT_DOWNLOADER_BINARY: &str = "gallery-dl";

/// Handle for a launched (or degenerate) media retrieval
///
/// Dropping the handle leaves the subprocess running; that is the
/// fire-and-forget contract. Call [`DetachedFetch::wait`] to opt in to
/// completion tracking instead.
#[derive(Debug)]
pub struct DetachedFetch {
    child: Option<tokio::process::Child>,
}

impl DetachedFetch {
    fn spawned(child: tokio::process::Child) -> Self {
        Self { child: Some(child) }
    }

    /// A fetch that required no subprocess (no-op downloader)
    pub fn completed() -> Self {
        Self { child: None }
    }

    /// Explicitly abandon the fetch, leaving any subprocess running
    pub fn detach(self) {}

    /// Wait for the subprocess to finish
    ///
    /// Returns `None` when no subprocess was launched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] if waiting on the subprocess fails.
    pub async fn wait(mut self) -> Result<Option<std::process::ExitStatus>> {
        match self.child.take() {
            None => Ok(None),
            Some(mut child) => {
                let status = child.wait().await.map_err(|e| {
                    Error::ExternalTool(format!("failed to wait on downloader: {e}"))
                })?;
                Ok(Some(status))
            }
        }
    }
}

/// Trait for bulk media retrieval delegation
///
/// Implementations launch (or simulate) the retrieval of a submission's
/// media into `<item_dir>/content`.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Launch media retrieval for `url` into the item directory
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalTool`] if the downloader cannot be spawned.
    /// Spawning is the only observed failure mode; the retrieval itself is
    /// detached.
    async fn delegate(&self, url: &str, item_dir: &Path) -> Result<DetachedFetch>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// CLI-based media downloader invoking an external binary
///
/// The binary is invoked as `<binary> --dest <item_dir>/content <url>` and
/// left to run detached.
pub struct CliMediaDownloader {
    binary_path: PathBuf,
}

impl CliMediaDownloader {
    /// Create a new CLI downloader with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find the default downloader binary in PATH
    ///
    /// Returns `None` if the binary is not found.
    pub fn from_path() -> Option<Self> {
        which::which(DEFAULT_DOWNLOADER_BINARY).ok().map(Self::new)
    }
}

#[async_trait]
impl MediaDownloader for CliMediaDownloader {
    async fn delegate(&self, url: &str, item_dir: &Path) -> Result<DetachedFetch> {
        let dest = item_dir.join(CONTENT_SUBDIR);
        let child = Command::new(&self.binary_path)
            .arg("--dest")
            .arg(&dest)
            .arg(url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::ExternalTool(format!(
                    "failed to spawn {}: {e}",
                    self.binary_path.display()
                ))
            })?;

        tracing::debug!(url, dest = %dest.display(), "Delegated media retrieval");
        Ok(DetachedFetch::spawned(child))
    }

    fn name(&self) -> &'static str {
        "cli-downloader"
    }
}

/// No-op media downloader for graceful degradation
///
/// Used when no external binary is configured or discoverable. Delegation
/// "succeeds" immediately without retrieving anything, keeping the batch
/// classification semantics intact.
pub struct NoOpMediaDownloader;

#[async_trait]
impl MediaDownloader for NoOpMediaDownloader {
    async fn delegate(&self, url: &str, _item_dir: &Path) -> Result<DetachedFetch> {
        tracing::debug!(url, "No media downloader configured, skipping retrieval");
        Ok(DetachedFetch::completed())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Whether a thumbnail field is a fetchable link rather than a sentinel
fn resolvable_thumbnail(thumbnail: &str) -> Option<Url> {
    let url = Url::parse(thumbnail).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Best-effort streamed download of the record's thumbnail
///
/// Writes `thumbnail.jpg` into `item_dir`. Never fails: sentinel thumbnail
/// values are ignored and any transport or I/O failure is swallowed after a
/// debug log line.
pub async fn fetch_thumbnail(http: &reqwest::Client, record: &PostRecord, item_dir: &Path) {
    let Some(url) = resolvable_thumbnail(&record.thumbnail) else {
        return;
    };
    if let Err(e) = stream_to_file(http, url, &item_dir.join(THUMBNAIL_FILE_NAME)).await {
        tracing::debug!(id = %record.id, error = %e, "Thumbnail fetch failed, ignoring");
    }
}

async fn stream_to_file(http: &reqwest::Client, url: Url, path: &Path) -> Result<()> {
    let response = http.get(url).send().await?.error_for_status()?;
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

//! The download orchestrator
//!
//! [`RedditArchiver`] drives the per-item state machine: for each identifier
//! loaded from the batch input it fetches metadata, evaluates the placement
//! policy, lays out the output directory, persists the metadata artifact,
//! delegates bulk media retrieval, and records exactly one classification
//! among downloaded / skipped / failed.
//!
//! Identifiers are processed strictly sequentially; the only concurrency is
//! at the I/O suspension level plus the detached downloader subprocesses,
//! which run on past the orchestrator's advance to the next identifier.
//! Per-item errors are caught at the iteration boundary and recorded in the
//! failure ledger; only load-time errors propagate out of [`run`].
//!
//! Cancellation is cooperative: the token is observed at the top of each
//! iteration, so an interrupt stops the intake of new identifiers, lets the
//! ledger finalize, and leaves in-flight subprocesses running.
//!
//! [`run`]: RedditArchiver::run

use crate::client::{RedditClient, SubmissionApi};
use crate::config::Config;
use crate::error::{ItemError, Result};
use crate::input;
use crate::layout;
use crate::ledger::FailureLedger;
use crate::media::{self, CliMediaDownloader, MediaDownloader, NoOpMediaDownloader};
use crate::metadata;
use crate::policy;
use crate::progress::ProgressReporter;
use crate::types::{BatchSummary, Event, ItemOutcome, Placement, PostId};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Batch archiver instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct RedditArchiver {
    /// Configuration (wrapped in Arc for sharing across tasks)
    config: Arc<Config>,
    /// Remote metadata capability (trait object for stubbing)
    api: Arc<dyn SubmissionApi>,
    /// Bulk media retrieval delegation (trait object for pluggable implementations)
    media: Arc<dyn MediaDownloader>,
    /// HTTP client used for direct thumbnail downloads
    http: reqwest::Client,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    /// Cancellation token observed at the top of each batch iteration
    cancel: CancellationToken,
}

impl RedditArchiver {
    /// Create a new archiver from the given configuration
    ///
    /// Validates the configuration, builds the Reddit API client, and
    /// selects a media downloader: an explicitly configured binary path
    /// wins, then PATH discovery (if enabled), then the no-op fallback.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for invalid settings or
    /// [`crate::Error::Network`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let api = Arc::new(RedditClient::new(config.client.clone())?);

        let media: Arc<dyn MediaDownloader> =
            if let Some(ref path) = config.tools.downloader_path {
                Arc::new(CliMediaDownloader::new(path.clone()))
            } else if config.tools.search_path {
                CliMediaDownloader::from_path()
                    .map(|d| Arc::new(d) as Arc<dyn MediaDownloader>)
                    .unwrap_or_else(|| Arc::new(NoOpMediaDownloader))
            } else {
                Arc::new(NoOpMediaDownloader)
            };
        tracing::info!(media_downloader = media.name(), "Media downloader selected");

        let http = reqwest::Client::builder()
            .user_agent(config.client.user_agent.clone())
            .timeout(config.client.request_timeout)
            .build()?;

        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            config: Arc::new(config),
            api,
            media,
            http,
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the metadata capability (tests, embedders with own API access)
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn SubmissionApi>) -> Self {
        self.api = api;
        self
    }

    /// Replace the media downloader
    #[must_use]
    pub fn with_media_downloader(mut self, media: Arc<dyn MediaDownloader>) -> Self {
        self.media = media;
        self
    }

    /// Subscribe to batch progress events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the intake of new identifiers when cancelled
    ///
    /// Cancelling mid-batch finalizes the ledger with whatever was recorded
    /// so far; it does not stop in-flight downloader subprocesses.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Process the batch named by `input_path` to completion or cancellation
    ///
    /// Every identifier in the input produces exactly one classification;
    /// the failure ledger is merged and persisted at the output root before
    /// this returns, including on the cancellation path.
    ///
    /// # Errors
    ///
    /// Returns an error only for batch-fatal conditions: a missing or
    /// malformed input file, or a failure to persist the ledger. Per-item
    /// errors never escape the loop.
    pub async fn run(&self, input_path: &Path) -> Result<BatchSummary> {
        let ids = input::load_batch(input_path, self.config.archive.comment_marker).await?;
        tracing::info!(
            input = %input_path.display(),
            total = ids.len(),
            "Starting batch"
        );

        let mut reporter = ProgressReporter::new(ids.len(), self.event_tx.clone());
        let mut ledger = FailureLedger::new();
        let mut cancelled = false;

        for id in &ids {
            if self.cancel.is_cancelled() {
                tracing::info!(remaining = reporter.counters().remaining(), "Batch cancelled");
                cancelled = true;
                break;
            }

            match self.process_item(id).await {
                Ok(outcome) => reporter.record(id, outcome),
                Err(e) => {
                    let permalink = e
                        .permalink()
                        .map(str::to_string)
                        .unwrap_or_else(|| self.api.fallback_permalink(id));
                    tracing::warn!(id = %id, error = %e, "Item failed");
                    ledger.record(id.clone(), permalink);
                    reporter.record(id, ItemOutcome::Failed);
                }
            }
        }

        ledger.finalize(&self.config.archive.output_root).await?;
        Ok(reporter.finish(cancelled))
    }

    /// Advance one identifier through the full pipeline
    ///
    /// fetch → policy → place → write → thumbnail → delegate. Any
    /// [`ItemError`] aborts this identifier only.
    async fn process_item(&self, id: &PostId) -> std::result::Result<ItemOutcome, ItemError> {
        let record = self.api.fetch_submission(id).await?;

        let placement = policy::decide(&record, &self.config.policy);
        if placement == Placement::Skip {
            tracing::debug!(id = %id, "Excluded by policy");
            return Ok(ItemOutcome::Skipped);
        }

        let Some(dir) =
            layout::place(&self.config.archive.output_root, &placement, &record).await?
        else {
            return Ok(ItemOutcome::Skipped);
        };

        if !self.config.policy.media_only {
            metadata::write_record(&dir, &record).await?;
        }

        // Best-effort; never affects classification.
        media::fetch_thumbnail(&self.http, &record, &dir).await;

        let fetch = self.media.delegate(&record.url, &dir).await.map_err(|e| {
            ItemError::DelegationFailed {
                id: id.clone(),
                reason: e.to_string(),
                permalink: record.permalink.clone(),
            }
        })?;
        // Fire-and-forget: the subprocess outlives this iteration and its
        // exit status is not inspected.
        fetch.detach();

        Ok(ItemOutcome::Downloaded)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::error::Error;
    use crate::ledger::LEDGER_FILE_NAME;
    use crate::types::PostRecord;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Stubbed metadata capability backed by a fixed record map
    struct StubApi {
        records: HashMap<String, PostRecord>,
    }

    #[async_trait]
    impl SubmissionApi for StubApi {
        async fn fetch_submission(&self, id: &PostId) -> std::result::Result<PostRecord, ItemError> {
            self.records
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| ItemError::FetchFailed {
                    id: id.clone(),
                    reason: "stubbed failure".to_string(),
                })
        }

        fn fallback_permalink(&self, id: &PostId) -> String {
            format!("https://www.reddit.com/{id}")
        }
    }

    /// Media downloader stub recording every delegated URL
    #[derive(Default)]
    struct RecordingDownloader {
        delegated: Mutex<Vec<(String, std::path::PathBuf)>>,
    }

    #[async_trait]
    impl MediaDownloader for RecordingDownloader {
        async fn delegate(
            &self,
            url: &str,
            item_dir: &Path,
        ) -> Result<crate::media::DetachedFetch> {
            self.delegated
                .lock()
                .unwrap()
                .push((url.to_string(), item_dir.to_path_buf()));
            Ok(crate::media::DetachedFetch::completed())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    /// Media downloader stub whose launch always fails
    struct FailingDownloader;

    #[async_trait]
    impl MediaDownloader for FailingDownloader {
        async fn delegate(
            &self,
            _url: &str,
            _item_dir: &Path,
        ) -> Result<crate::media::DetachedFetch> {
            Err(Error::ExternalTool("spawn refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn record(id: &str, subreddit: &str) -> PostRecord {
        PostRecord {
            id: PostId::new(id),
            permalink: format!("https://www.reddit.com/r/{subreddit}/comments/{id}/"),
            author: "ferris".to_string(),
            subreddit: subreddit.to_string(),
            created: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            score: 1,
            ups: 1,
            downs: 0,
            over_18: false,
            removal_category: None,
            title: "t".to_string(),
            selftext: "body".to_string(),
            thumbnail: "self".to_string(),
            domain: "i.imgur.com".to_string(),
            url: format!("https://i.imgur.com/{id}.png"),
        }
    }

    fn archiver(
        temp_dir: &TempDir,
        policy: PolicyConfig,
        records: Vec<PostRecord>,
    ) -> (RedditArchiver, Arc<RecordingDownloader>) {
        let mut config = Config::default();
        config.archive.output_root = temp_dir.path().join("archive");
        config.policy = policy;
        config.tools.search_path = false;

        let api = Arc::new(StubApi {
            records: records
                .into_iter()
                .map(|r| (r.id.as_str().to_string(), r))
                .collect(),
        });
        let media = Arc::new(RecordingDownloader::default());
        let archiver = RedditArchiver::new(config)
            .unwrap()
            .with_api(api)
            .with_media_downloader(media.clone());
        (archiver, media)
    }

    fn write_input(temp_dir: &TempDir, ids: &[&str]) -> std::path::PathBuf {
        let path = temp_dir.path().join("batch.csv");
        let mut contents = String::from("id,permalink\n");
        for id in ids {
            contents.push_str(id);
            contents.push('\n');
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_successful_item_is_downloaded_and_delegated() {
        let temp_dir = TempDir::new().unwrap();
        let (archiver, media) = archiver(
            &temp_dir,
            PolicyConfig::default(),
            vec![record("a1", "rust")],
        );
        let input = write_input(&temp_dir, &["a1"]);

        let summary = archiver.run(&input).await.unwrap();
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 0);

        let item_dir = temp_dir.path().join("archive/rust/a1");
        assert!(item_dir.join("post.json").is_file());
        let delegated = media.delegated.lock().unwrap();
        assert_eq!(delegated.len(), 1);
        assert_eq!(delegated[0].0, "https://i.imgur.com/a1.png");
        assert_eq!(delegated[0].1, item_dir);
    }

    #[tokio::test]
    async fn test_fetch_failure_lands_in_ledger_with_fallback_link() {
        let temp_dir = TempDir::new().unwrap();
        let (archiver, _media) = archiver(&temp_dir, PolicyConfig::default(), vec![]);
        let input = write_input(&temp_dir, &["a3"]);

        let summary = archiver.run(&input).await.unwrap();
        assert_eq!(summary.failed, 1);

        let ledger = fs::read_to_string(
            temp_dir.path().join("archive").join(LEDGER_FILE_NAME),
        )
        .unwrap();
        assert_eq!(ledger, "id,permalink\na3,https://www.reddit.com/a3\n");
    }

    #[tokio::test]
    async fn test_post_fetch_failure_ledgers_real_permalink() {
        // Failures after a successful fetch know the record's permalink and
        // must ledger it, not the synthesized fallback link.
        let temp_dir = TempDir::new().unwrap();
        let (archiver, _media) = archiver(
            &temp_dir,
            PolicyConfig::default(),
            vec![record("a1", "rust")],
        );
        let archiver = archiver.with_media_downloader(Arc::new(FailingDownloader));
        let input = write_input(&temp_dir, &["a1"]);

        let summary = archiver.run(&input).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.downloaded, 0);

        let ledger = fs::read_to_string(
            temp_dir.path().join("archive").join(LEDGER_FILE_NAME),
        )
        .unwrap();
        assert_eq!(
            ledger,
            "id,permalink\na1,https://www.reddit.com/r/rust/comments/a1/\n"
        );
    }

    #[tokio::test]
    async fn test_removed_item_is_skipped_without_save_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let mut removed = record("a2", "rust");
        removed.selftext = "[removed]".to_string();
        let (archiver, media) = archiver(&temp_dir, PolicyConfig::default(), vec![removed]);
        let input = write_input(&temp_dir, &["a2"]);

        let summary = archiver.run(&input).await.unwrap();
        assert_eq!(summary.skipped, 1);
        // No directory under the normal path, no delegation.
        assert!(!temp_dir.path().join("archive/rust/a2").exists());
        assert!(media.delegated.lock().unwrap().is_empty());
        // Skips never enter the failure ledger.
        let ledger = fs::read_to_string(
            temp_dir.path().join("archive").join(LEDGER_FILE_NAME),
        )
        .unwrap();
        assert_eq!(ledger, "id,permalink\n");
    }

    #[tokio::test]
    async fn test_removed_item_goes_to_deleted_tree_with_save_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let mut removed = record("a2", "rust");
        removed.selftext = "[removed]".to_string();
        let policy = PolicyConfig {
            save_deleted: true,
            ..Default::default()
        };
        let (archiver, _media) = archiver(&temp_dir, policy, vec![removed]);
        let input = write_input(&temp_dir, &["a2"]);

        let summary = archiver.run(&input).await.unwrap();
        assert_eq!(summary.downloaded, 1);
        assert!(temp_dir.path().join("archive/deleted/rust/a2/post.json").is_file());
        assert!(!temp_dir.path().join("archive/rust/a2").exists());
    }

    #[tokio::test]
    async fn test_media_only_skips_metadata_but_places_and_delegates() {
        let temp_dir = TempDir::new().unwrap();
        let policy = PolicyConfig {
            media_only: true,
            ..Default::default()
        };
        let (archiver, media) = archiver(&temp_dir, policy, vec![record("a1", "rust")]);
        let input = write_input(&temp_dir, &["a1"]);

        archiver.run(&input).await.unwrap();
        let item_dir = temp_dir.path().join("archive/rust/a1");
        assert!(item_dir.is_dir());
        assert!(!item_dir.join("post.json").exists());
        assert_eq!(media.delegated.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nsfw_only_skips_sfw_before_placement() {
        let temp_dir = TempDir::new().unwrap();
        let policy = PolicyConfig {
            nsfw_only: true,
            ..Default::default()
        };
        let (archiver, _media) = archiver(&temp_dir, policy, vec![record("a1", "rust")]);
        let input = write_input(&temp_dir, &["a1"]);

        let summary = archiver.run(&input).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(!temp_dir.path().join("archive/rust").exists());
    }

    #[tokio::test]
    async fn test_cancellation_stops_intake_and_still_finalizes_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let (archiver, _media) = archiver(
            &temp_dir,
            PolicyConfig::default(),
            vec![record("a1", "rust")],
        );
        let input = write_input(&temp_dir, &["a1", "a2", "a3"]);

        archiver.cancellation_token().cancel();
        let summary = archiver.run(&input).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.unprocessed(), 3);
        // Ledger is written even when nothing was processed.
        assert!(temp_dir
            .path()
            .join("archive")
            .join(LEDGER_FILE_NAME)
            .is_file());
    }

    #[tokio::test]
    async fn test_missing_input_is_batch_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let (archiver, _media) = archiver(&temp_dir, PolicyConfig::default(), vec![]);
        let err = archiver
            .run(&temp_dir.path().join("absent.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_every_identifier_gets_exactly_one_classification() {
        let temp_dir = TempDir::new().unwrap();
        let mut removed = record("a2", "rust");
        removed.selftext = "[removed]".to_string();
        let (archiver, _media) = archiver(
            &temp_dir,
            PolicyConfig::default(),
            vec![record("a1", "rust"), removed],
        );
        let input = write_input(&temp_dir, &["a1", "a2", "a3"]);

        let summary = archiver.run(&input).await.unwrap();
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.downloaded + summary.skipped + summary.failed,
            summary.total
        );
    }
}

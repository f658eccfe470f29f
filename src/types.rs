//! Core types and events for reddit-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a Reddit submission
///
/// An opaque token (the base-36 id without any `t3_` kind prefix). Read once
/// from the batch input file and consumed by exactly one orchestrator
/// iteration; never mutated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    /// Create a new PostId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fullname form used by the Reddit info API (`t3_<id>`)
    pub fn fullname(&self) -> String {
        format!("t3_{}", self.0)
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PostId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Why a submission's content was removed, as reported by the API
///
/// `None` on a [`PostRecord`] means the submission is live. This is distinct
/// from the body-text sentinel check in the policy evaluator (see
/// [`crate::policy`]), which also fires for posts whose text merely equals
/// the sentinel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCategory {
    /// Deleted by the author
    Deleted,
    /// Removed by a subreddit moderator
    Moderator,
    /// Removed by Reddit itself (admin, anti-evil, legal)
    Reddit,
    /// Removed by an automated moderation tool
    Automod,
    /// Any other category string the API may introduce
    Other(String),
}

impl RemovalCategory {
    /// Parse the API's `removed_by_category` string
    pub fn from_api(value: &str) -> Self {
        match value {
            "deleted" => RemovalCategory::Deleted,
            "moderator" => RemovalCategory::Moderator,
            "reddit" | "anti_evil_ops" | "community_ops" | "legal_operations" => {
                RemovalCategory::Reddit
            }
            "automod_filtered" => RemovalCategory::Automod,
            other => RemovalCategory::Other(other.to_string()),
        }
    }
}

/// Normalized, fully-fetched metadata for one submission
///
/// A `PostRecord` exists only if the fetch succeeded for every required
/// field; the fetcher discards partial results and fails the identifier as
/// a unit. This is the exact shape serialized to the per-item `post.json`
/// artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Submission id (base-36, no kind prefix)
    pub id: PostId,
    /// Absolute permalink to the submission
    pub permalink: String,
    /// Author username (the literal string "[deleted]" for deleted accounts)
    pub author: String,
    /// Subreddit name without the `r/` prefix
    pub subreddit: String,
    /// Creation time (UTC)
    pub created: DateTime<Utc>,
    /// Net score
    pub score: i64,
    /// Upvote count
    pub ups: i64,
    /// Downvote count (the public API reports 0 for most submissions)
    pub downs: i64,
    /// Whether the submission is flagged as adult content
    pub over_18: bool,
    /// Removal reason, if the content has been taken down
    pub removal_category: Option<RemovalCategory>,
    /// Submission title
    pub title: String,
    /// Self-text body (empty for link posts)
    pub selftext: String,
    /// Thumbnail reference: either an http(s) URL or a sentinel string such
    /// as "self", "default", "nsfw", or "spoiler"
    pub thumbnail: String,
    /// Source domain of the linked content
    pub domain: String,
    /// Source URL the media delegator is pointed at
    pub url: String,
}

/// Policy-derived choice of output location or exclusion for one record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Archive under `<output-root>/<subreddit>/<id>`
    Normal,
    /// Removed content, archive under `<output-root>/deleted/<subreddit>/<id>`
    /// (save-deleted policy active)
    Alternate,
    /// Excluded by policy; no directory is created
    Skip,
}

/// Final classification of one processed identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOutcome {
    /// Metadata persisted and media retrieval delegated
    ///
    /// Reflects successful *delegation* to the external downloader, not
    /// completion of the media fetch itself.
    Downloaded,
    /// Excluded by policy before placement
    Skipped,
    /// Failed at some pipeline stage; recorded in the failure ledger
    Failed,
}

/// Events emitted by the archiver during a batch run
///
/// Consumers subscribe via [`crate::RedditArchiver::subscribe`]; the crate
/// renders nothing itself.
#[derive(Clone, Debug)]
pub enum Event {
    /// Batch started; `total` identifiers will be processed
    BatchStarted {
        /// Number of identifiers loaded from the input file
        total: usize,
    },
    /// One identifier finished its pipeline
    ItemFinished {
        /// The identifier that was processed
        id: PostId,
        /// Its classification
        outcome: ItemOutcome,
        /// Counter snapshot after recording this item
        counters: crate::progress::CounterSnapshot,
    },
    /// Batch finished (normally or via cancellation); ledger persisted
    BatchFinished {
        /// Final aggregate result of the run
        summary: BatchSummary,
    },
}

/// Aggregate result of one batch run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of identifiers in the batch
    pub total: usize,
    /// Items whose media retrieval was successfully delegated
    pub downloaded: usize,
    /// Items excluded by policy
    pub skipped: usize,
    /// Items that failed at any stage
    pub failed: usize,
    /// Whether the run was cut short by cancellation
    pub cancelled: bool,
}

impl BatchSummary {
    /// Identifiers never reached because the run was cancelled
    pub fn unprocessed(&self) -> usize {
        self.total - self.downloaded - self.skipped - self.failed
    }
}

//! Configuration types for reddit-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Remote API client configuration
///
/// Groups settings for the Reddit metadata client. Used as a nested
/// sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Reddit API host (default: "https://www.reddit.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    ///
    /// Reddit rejects generic client UAs, so a descriptive default is
    /// provided.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30s)
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,

    /// Continue past rate-limit rejections instead of failing the fetch
    ///
    /// When enabled, an HTTP 429 response triggers a bounded backoff-and-retry
    /// inside the client rather than surfacing as a fetch failure (default:
    /// true).
    #[serde(default = "default_true")]
    pub tolerate_rate_limit: bool,

    /// Delay before retrying after a rate-limit rejection (default: 10s)
    ///
    /// A `Retry-After` header on the response takes precedence when present.
    #[serde(default = "default_rate_limit_backoff", with = "duration_secs")]
    pub rate_limit_backoff: Duration,

    /// Maximum rate-limit retries per fetch before giving up (default: 3)
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            tolerate_rate_limit: true,
            rate_limit_backoff: default_rate_limit_backoff(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
        }
    }
}

/// Archive layout and input-file configuration
///
/// Groups settings for where output lands and how the batch input file is
/// parsed. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Root directory of the archive tree (default: "./archive")
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Leading marker for comment lines in the batch input file (default: '#')
    #[serde(default = "default_comment_marker")]
    pub comment_marker: char,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            comment_marker: default_comment_marker(),
        }
    }
}

/// Inclusion/exclusion policy configuration
///
/// Groups the knobs the policy evaluator reads. Used as a nested sub-config
/// within [`Config`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Archive removed/deleted content under `deleted/<subreddit>/<id>`
    /// instead of skipping it (default: false)
    #[serde(default)]
    pub save_deleted: bool,

    /// Only archive submissions flagged as adult content; everything else is
    /// skipped (default: false)
    #[serde(default)]
    pub nsfw_only: bool,

    /// Skip the metadata artifact; still place directories and delegate
    /// media retrieval (default: false)
    #[serde(default)]
    pub media_only: bool,
}

/// External tool configuration (media downloader binary)
///
/// Groups settings for locating the external bulk-media downloader. Used as
/// a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the media downloader executable (auto-detected if None)
    #[serde(default)]
    pub downloader_path: Option<PathBuf>,

    /// Whether to search PATH for the downloader if no explicit path is set
    /// (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for [`crate::RedditArchiver`]
///
/// Fields are organized into logical sub-configs:
/// - [`client`](ClientConfig) — remote API host, timeouts, rate-limit handling
/// - [`archive`](ArchiveConfig) — output root, input-file comment marker
/// - [`policy`](PolicyConfig) — save-deleted / nsfw-only / media-only knobs
/// - [`tools`](ToolsConfig) — external downloader discovery
///
/// All sub-config fields are flattened for serialization, so the JSON/TOML
/// format has no nesting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API client settings
    #[serde(flatten)]
    pub client: ClientConfig,

    /// Archive layout and input parsing settings
    #[serde(flatten)]
    pub archive: ArchiveConfig,

    /// Inclusion/exclusion policies
    #[serde(flatten)]
    pub policy: PolicyConfig,

    /// External tool settings
    #[serde(flatten)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// Returns a keyed [`Error::Config`] describing the first invalid
    /// setting found.
    pub fn validate(&self) -> Result<()> {
        if self.client.base_url.is_empty() {
            return Err(Error::Config {
                message: "base_url must not be empty".to_string(),
                key: Some("base_url".to_string()),
            });
        }
        if !self.client.base_url.starts_with("http://")
            && !self.client.base_url.starts_with("https://")
        {
            return Err(Error::Config {
                message: format!(
                    "base_url must be an http(s) URL, got '{}'",
                    self.client.base_url
                ),
                key: Some("base_url".to_string()),
            });
        }
        if self.client.user_agent.is_empty() {
            return Err(Error::Config {
                message: "user_agent must not be empty (Reddit rejects blank UAs)".to_string(),
                key: Some("user_agent".to_string()),
            });
        }
        if self.archive.output_root.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "output_root must not be empty".to_string(),
                key: Some("output_root".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_user_agent() -> String {
    format!("reddit-dl/{} (batch archiver)", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_rate_limit_backoff() -> Duration {
    Duration::from_secs(10)
}

fn default_max_rate_limit_retries() -> u32 {
    3
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./archive")
}

fn default_comment_marker() -> char {
    '#'
}

fn default_true() -> bool {
    true
}

/// Serialize/deserialize `Duration` as whole seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

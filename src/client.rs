//! Reddit submission metadata client
//!
//! This module provides the remote metadata capability behind the
//! [`SubmissionApi`] trait: one logical operation, "fetch submission by
//! identifier", returning a fully-populated [`PostRecord`] or failing as a
//! unit. The concrete [`RedditClient`] talks to the public Reddit JSON API
//! (`GET /api/info.json?id=t3_<id>`) and normalizes the loosely-typed
//! payload into the fixed record shape in one explicit mapping step; a
//! missing required field discards the whole result.
//!
//! Rate-limit handling is a client knob, not an orchestrator concern: with
//! `tolerate_rate_limit` enabled, HTTP 429 responses trigger a bounded
//! backoff-and-retry inside the fetch instead of failing the identifier.

use crate::config::ClientConfig;
use crate::error::ItemError;
use crate::types::{PostId, PostRecord, RemovalCategory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Remote capability for fetching submission metadata
///
/// The orchestrator depends on this trait rather than on a concrete client,
/// so tests (and embedders with their own API access) can substitute a stub.
#[async_trait]
pub trait SubmissionApi: Send + Sync {
    /// Fetch one submission's metadata
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::FetchFailed`] if the submission no longer
    /// exists, any required field is absent from the payload, or the
    /// transport fails unrecoverably. No partial record is ever returned.
    async fn fetch_submission(&self, id: &PostId) -> Result<PostRecord, ItemError>;

    /// Synthesize a fallback link for an identifier whose fetch failed
    ///
    /// A fetch failure never learns the real permalink, so the failure
    /// ledger records `https://<host>/<id>` instead.
    fn fallback_permalink(&self, id: &PostId) -> String;
}

/// HTTP client for the public Reddit JSON API
pub struct RedditClient {
    http: reqwest::Client,
    config: ClientConfig,
}

/// Raw info-listing envelope: `{"data": {"children": [{"data": {...}}]}}`
#[derive(Debug, Deserialize)]
struct InfoListing {
    data: InfoListingData,
}

#[derive(Debug, Deserialize)]
struct InfoListingData {
    children: Vec<InfoChild>,
}

#[derive(Debug, Deserialize)]
struct InfoChild {
    data: RawSubmission,
}

/// Raw submission payload, limited to the fields the record needs
///
/// Every non-`Option` field here is required: serde fails the whole
/// deserialization if one is absent, which is exactly the atomic-fetch
/// contract.
#[derive(Debug, Deserialize)]
struct RawSubmission {
    id: String,
    permalink: String,
    author: String,
    subreddit: String,
    created_utc: f64,
    score: i64,
    ups: i64,
    #[serde(default)]
    downs: i64,
    over_18: bool,
    removed_by_category: Option<String>,
    title: String,
    selftext: String,
    thumbnail: String,
    domain: String,
    url: String,
}

impl RedditClient {
    /// Create a new client from the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Network`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn fetch_failed(id: &PostId, reason: impl Into<String>) -> ItemError {
        ItemError::FetchFailed {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    /// Map the raw payload into the fixed record shape
    ///
    /// Fails if the timestamp is not representable; every other required
    /// field was already enforced by deserialization.
    fn normalize(&self, id: &PostId, raw: RawSubmission) -> Result<PostRecord, ItemError> {
        let created = DateTime::<Utc>::from_timestamp(raw.created_utc as i64, 0)
            .ok_or_else(|| Self::fetch_failed(id, format!("invalid timestamp {}", raw.created_utc)))?;

        // The API reports permalinks relative to the host.
        let permalink = if raw.permalink.starts_with('/') {
            format!("{}{}", self.base(), raw.permalink)
        } else {
            raw.permalink
        };

        Ok(PostRecord {
            id: PostId::new(raw.id),
            permalink,
            author: raw.author,
            subreddit: raw.subreddit,
            created,
            score: raw.score,
            ups: raw.ups,
            downs: raw.downs,
            over_18: raw.over_18,
            removal_category: raw
                .removed_by_category
                .as_deref()
                .map(RemovalCategory::from_api),
            title: raw.title,
            selftext: raw.selftext,
            thumbnail: raw.thumbnail,
            domain: raw.domain,
            url: raw.url,
        })
    }
}

#[async_trait]
impl SubmissionApi for RedditClient {
    async fn fetch_submission(&self, id: &PostId) -> Result<PostRecord, ItemError> {
        let url = format!("{}/api/info.json?id={}", self.base(), id.fullname());
        let mut rate_limit_retries = 0u32;

        let response = loop {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| Self::fetch_failed(id, format!("request failed: {e}")))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if !self.config.tolerate_rate_limit
                    || rate_limit_retries >= self.config.max_rate_limit_retries
                {
                    return Err(Self::fetch_failed(id, "rate limited"));
                }
                let delay = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(std::time::Duration::from_secs)
                    .unwrap_or(self.config.rate_limit_backoff);
                rate_limit_retries += 1;
                tracing::warn!(
                    id = %id,
                    retry = rate_limit_retries,
                    delay_secs = delay.as_secs(),
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !response.status().is_success() {
                return Err(Self::fetch_failed(
                    id,
                    format!("HTTP {}", response.status()),
                ));
            }
            break response;
        };

        let listing: InfoListing = response
            .json()
            .await
            .map_err(|e| Self::fetch_failed(id, format!("invalid payload: {e}")))?;

        let child = listing
            .data
            .children
            .into_iter()
            .next()
            .ok_or_else(|| Self::fetch_failed(id, "submission no longer exists"))?;

        let record = self.normalize(id, child.data)?;
        tracing::debug!(id = %id, subreddit = %record.subreddit, "Fetched submission metadata");
        Ok(record)
    }

    fn fallback_permalink(&self, id: &PostId) -> String {
        format!("{}/{}", self.base(), id)
    }
}

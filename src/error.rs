//! Error types for reddit-dl
//!
//! This module provides the error taxonomy for the library:
//! - Batch-fatal errors (input file missing or malformed, invalid config)
//! - Per-item errors ([`ItemError`]) that are caught at the orchestrator's
//!   iteration boundary and never escape the batch loop
//! - Infrastructure errors (I/O, network) with `#[from]` conversions so `?`
//!   works throughout

use crate::types::PostId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reddit-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reddit-dl
///
/// Variants carry enough context to diagnose issues without re-deriving it
/// from the call site.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "output_root")
        key: Option<String>,
    },

    /// Batch input file does not exist
    #[error("input file not found: {path}")]
    InputNotFound {
        /// The path that was given as the batch input file
        path: PathBuf,
    },

    /// Batch input file exists but a data row could not be parsed
    #[error("malformed input at {path}:{line}: {message}")]
    MalformedInput {
        /// The batch input file being parsed
        path: PathBuf,
        /// 1-based line number of the offending row
        line: usize,
        /// What was wrong with the row
        message: String,
    },

    /// Per-item processing error (recorded in the ledger, never batch-fatal)
    ///
    /// The orchestrator matches [`ItemError`] directly at its iteration
    /// boundary; this variant and its `#[from]` conversion exist for
    /// embedders calling the component functions (placement, metadata
    /// write) with `?` in a context returning [`Result`].
    #[error(transparent)]
    Item(#[from] ItemError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External tool execution failed (media downloader binary)
    #[error("external tool error: {0}")]
    ExternalTool(String),
}

/// Errors local to a single identifier's pipeline run
///
/// The orchestrator catches these at the loop boundary, records the
/// identifier as failed in the [`crate::ledger::FailureLedger`], and moves
/// on to the next identifier. Each variant knows which permalink to write
/// into the ledger: a fetch failure can only synthesize a fallback link,
/// while placement/write failures carry the fetched record's real permalink.
#[derive(Debug, Error)]
pub enum ItemError {
    /// Metadata fetch failed as a unit (missing item, missing required
    /// field, or an unrecoverable transport error)
    #[error("metadata fetch failed for {id}: {reason}")]
    FetchFailed {
        /// The identifier whose fetch failed
        id: PostId,
        /// Why the fetch failed
        reason: String,
    },

    /// Output directory could not be created
    #[error("placement failed for {id} at {path}: {reason}")]
    PlacementFailed {
        /// The identifier being placed
        id: PostId,
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying I/O failure
        reason: String,
        /// Real permalink of the already-fetched record, for the ledger
        permalink: String,
    },

    /// Metadata artifact could not be written
    #[error("metadata write failed for {id} at {path}: {reason}")]
    WriteFailed {
        /// The identifier whose metadata could not be persisted
        id: PostId,
        /// The file that could not be written
        path: PathBuf,
        /// The underlying failure
        reason: String,
        /// Real permalink of the already-fetched record, for the ledger
        permalink: String,
    },

    /// The external downloader could not be launched
    ///
    /// Distinct from the subprocess failing after launch, which is not
    /// observed (fire-and-forget delegation).
    #[error("media delegation failed for {id}: {reason}")]
    DelegationFailed {
        /// The identifier whose media retrieval could not be delegated
        id: PostId,
        /// Why the launch failed
        reason: String,
        /// Real permalink of the already-fetched record, for the ledger
        permalink: String,
    },
}

impl ItemError {
    /// The identifier this error belongs to
    pub fn id(&self) -> &PostId {
        match self {
            ItemError::FetchFailed { id, .. }
            | ItemError::PlacementFailed { id, .. }
            | ItemError::WriteFailed { id, .. }
            | ItemError::DelegationFailed { id, .. } => id,
        }
    }

    /// The permalink to record in the failure ledger, if the pipeline got
    /// far enough to know the real one
    ///
    /// `FetchFailed` returns `None`; the orchestrator substitutes a
    /// synthesized fallback link in that case.
    pub fn permalink(&self) -> Option<&str> {
        match self {
            ItemError::FetchFailed { .. } => None,
            ItemError::PlacementFailed { permalink, .. }
            | ItemError::WriteFailed { permalink, .. }
            | ItemError::DelegationFailed { permalink, .. } => Some(permalink),
        }
    }
}

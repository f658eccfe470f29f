//! # reddit-dl
//!
//! Batch Reddit submission archiver library.
//!
//! ## Design Philosophy
//!
//! reddit-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Event-driven** - Consumers subscribe to progress events, no polling required
//! - **Delegating** - Bulk media retrieval is handed to an external
//!   downloader binary; this crate orchestrates, it does not extract media
//!
//! ## Quick Start
//!
//! ```no_run
//! use reddit_dl::{Config, RedditArchiver};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.policy.save_deleted = true;
//!
//!     let archiver = RedditArchiver::new(config)?;
//!
//!     // Subscribe to progress events
//!     let mut events = archiver.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = archiver.run(Path::new("batch.csv")).await?;
//!     println!("downloaded {} of {}", summary.downloaded, summary.total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch orchestrator
pub mod archiver;
/// Reddit metadata client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Batch input file parsing
pub mod input;
/// Archive directory layout
pub mod layout;
/// Persistent failure ledger
pub mod ledger;
/// Media retrieval delegation
pub mod media;
/// Metadata artifact persistence
pub mod metadata;
/// Placement policy evaluation
pub mod policy;
/// Progress tracking and reporting
pub mod progress;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archiver::RedditArchiver;
pub use client::{RedditClient, SubmissionApi};
pub use config::{ArchiveConfig, ClientConfig, Config, PolicyConfig, ToolsConfig};
pub use error::{Error, ItemError, Result};
pub use ledger::{FailureLedger, LEDGER_FILE_NAME};
pub use media::{
    CliMediaDownloader, DetachedFetch, MediaDownloader, NoOpMediaDownloader, THUMBNAIL_FILE_NAME,
};
pub use metadata::METADATA_FILE_NAME;
pub use progress::{BatchCounters, CounterSnapshot, ProgressReporter};
pub use types::{
    BatchSummary, Event, ItemOutcome, Placement, PostId, PostRecord, RemovalCategory,
};

/// Helper function to run a batch with graceful signal handling.
///
/// Spawns a signal listener that cancels the archiver's token, then runs the
/// batch. On interrupt the orchestrator stops taking new identifiers,
/// finalizes the failure ledger, and returns the partial summary.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use reddit_dl::{Config, RedditArchiver, run_with_shutdown};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let archiver = RedditArchiver::new(Config::default())?;
///     let summary = run_with_shutdown(&archiver, Path::new("batch.csv")).await?;
///     println!("{summary:?}");
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Propagates batch-fatal errors from [`RedditArchiver::run`].
pub async fn run_with_shutdown(
    archiver: &RedditArchiver,
    input_path: &std::path::Path,
) -> Result<BatchSummary> {
    let cancel = archiver.cancellation_token();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        cancel.cancel();
    });

    let summary = archiver.run(input_path).await;
    signal_task.abort();
    summary
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Handler registration may fail in restricted environments (containers,
    // tests); degrade from both signals to one to the ctrl_c fallback.
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "Could not register both signal handlers, waiting on one");
            only.recv().await;
            tracing::info!("Received termination signal");
        }
        (Err(_), Err(e)) => {
            tracing::error!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

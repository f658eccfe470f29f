//! Batch progress tracking and reporting
//!
//! Counters are a single owned value threaded through the orchestrator —
//! no ambient globals. The reporter surfaces each outcome as an [`Event`]
//! on the broadcast channel plus a structured tracing line; rendering is
//! left entirely to subscribers.
//!
//! Display folding: in the per-item progress line, skipped items are folded
//! into the failed bucket (matching the historical display behavior). The
//! counters themselves keep all three classifications distinct.

use crate::types::{BatchSummary, Event, ItemOutcome, PostId};
use tokio::sync::broadcast;

/// Process-wide progress state for one batch run
///
/// `total` is fixed at batch start; the per-outcome counters only ever
/// increase, once per processed identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchCounters {
    /// Batch size, fixed at start
    pub total: usize,
    /// Items whose media retrieval was delegated successfully
    pub downloaded: usize,
    /// Items excluded by policy
    pub skipped: usize,
    /// Items that failed at some stage
    pub failed: usize,
}

impl BatchCounters {
    /// Counters for a batch of `total` identifiers
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Identifiers not yet processed
    pub fn remaining(&self) -> usize {
        self.total - self.downloaded - self.skipped - self.failed
    }
}

/// Read-only counter snapshot attached to progress events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Batch size
    pub total: usize,
    /// Downloaded so far
    pub downloaded: usize,
    /// Failed so far, with skipped items folded in (display convention)
    pub failed_or_skipped: usize,
    /// Identifiers not yet processed
    pub remaining: usize,
}

/// Receives outcome events, maintains the counters, and notifies subscribers
pub struct ProgressReporter {
    counters: BatchCounters,
    event_tx: broadcast::Sender<Event>,
}

impl ProgressReporter {
    /// Create a reporter for a batch of `total` identifiers
    pub fn new(total: usize, event_tx: broadcast::Sender<Event>) -> Self {
        let reporter = Self {
            counters: BatchCounters::new(total),
            event_tx,
        };
        reporter.emit(Event::BatchStarted { total });
        reporter
    }

    /// Record one identifier's classification and notify subscribers
    pub fn record(&mut self, id: &PostId, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Downloaded => self.counters.downloaded += 1,
            ItemOutcome::Skipped => self.counters.skipped += 1,
            ItemOutcome::Failed => self.counters.failed += 1,
        }
        let snapshot = self.snapshot();
        tracing::info!(
            id = %id,
            outcome = ?outcome,
            downloaded = snapshot.downloaded,
            failed = snapshot.failed_or_skipped,
            remaining = snapshot.remaining,
            "Processed identifier"
        );
        self.emit(Event::ItemFinished {
            id: id.clone(),
            outcome,
            counters: snapshot,
        });
    }

    /// Current counters
    pub fn counters(&self) -> BatchCounters {
        self.counters
    }

    /// Snapshot with the skipped-folds-into-failed display convention applied
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.counters.total,
            downloaded: self.counters.downloaded,
            failed_or_skipped: self.counters.failed + self.counters.skipped,
            remaining: self.counters.remaining(),
        }
    }

    /// Build the final summary and notify subscribers that the batch ended
    ///
    /// Safe to call from the cancellation path; the snapshot reflects
    /// whatever was processed before the interrupt.
    pub fn finish(&self, cancelled: bool) -> BatchSummary {
        let summary = BatchSummary {
            total: self.counters.total,
            downloaded: self.counters.downloaded,
            skipped: self.counters.skipped,
            failed: self.counters.failed,
            cancelled,
        };
        tracing::info!(
            total = summary.total,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled,
            "Batch finished"
        );
        self.emit(Event::BatchFinished {
            summary: summary.clone(),
        });
        summary
    }

    fn emit(&self, event: Event) {
        // send() fails only when no subscribers exist, which is fine.
        self.event_tx.send(event).ok();
    }
}

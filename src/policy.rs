//! Inclusion/exclusion policy evaluation
//!
//! Given a fetched [`PostRecord`] and the active [`PolicyConfig`], decide
//! where the item's output goes or whether it is excluded entirely.
//! Precedence is fixed:
//!
//! 1. Removed/deleted content: `Alternate` if save-deleted is enabled,
//!    otherwise `Skip`.
//! 2. nsfw-only enabled and the record is not adult-flagged: `Skip`.
//! 3. Otherwise: `Normal`.

use crate::config::PolicyConfig;
use crate::types::{Placement, PostRecord};

/// Body-text sentinels Reddit substitutes for removed or deleted selftext
///
/// Known accuracy limitation: a live post whose original body literally
/// equals one of these strings is indistinguishable from removed content
/// and will be classified as removed. This matches the observed upstream
/// behavior and is intentionally not reinterpreted.
pub const REMOVAL_SENTINELS: [&str; 2] = ["[removed]", "[deleted]"];

/// Whether the record is classified as removed/deleted content
pub fn is_removed(record: &PostRecord) -> bool {
    record.removal_category.is_some()
        || REMOVAL_SENTINELS.contains(&record.selftext.trim())
}

/// Evaluate the placement policy for one record
pub fn decide(record: &PostRecord, policy: &PolicyConfig) -> Placement {
    if is_removed(record) {
        return if policy.save_deleted {
            Placement::Alternate
        } else {
            Placement::Skip
        };
    }
    if policy.nsfw_only && !record.over_18 {
        return Placement::Skip;
    }
    Placement::Normal
}

//! Load-more pagination: appends a new page to the current result set.
//!
//! Existing items are never removed or reordered, and the page intro is not
//! touched here at all. Whether repeats of already-shown items are kept is a
//! configuration choice; the default keeps them and only reports them.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::models::recommendation::Recommendation;

/// Number of items requested per load-more call.
pub const LOAD_MORE_BATCH: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Append every incoming item, repeats included.
    #[default]
    KeepAll,
    /// Drop incoming items whose identity key is already present.
    SkipKnown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppendSummary {
    pub appended: usize,
    /// Incoming items whose identity key was already present.
    pub repeated: usize,
    /// Repeats dropped under `SkipKnown`.
    pub skipped: usize,
}

pub fn append_page(
    existing: &mut Vec<Recommendation>,
    incoming: Vec<Recommendation>,
    policy: DedupPolicy,
) -> AppendSummary {
    let mut seen: HashSet<_> = existing.iter().map(Recommendation::identity_key).collect();
    let mut summary = AppendSummary::default();

    for item in incoming {
        let is_new = seen.insert(item.identity_key());
        if !is_new {
            summary.repeated += 1;
            if policy == DedupPolicy::SkipKnown {
                summary.skipped += 1;
                continue;
            }
        }
        existing.push(item);
        summary.appended += 1;
    }

    if summary.repeated > 0 {
        warn!(
            "Load-more returned {} repeated item(s), policy={:?}",
            summary.repeated, policy
        );
    }

    summary
}

use std::cmp::Ordering;

use crate::release::ReleaseEntry;
use crate::version::compare_versions;

/// Keep the entries the probed server is new enough to run.
///
/// Without a server baseline nothing is eligible.
#[must_use]
pub fn filter_eligible(
    entries: Vec<ReleaseEntry>,
    server_baseline: Option<&str>,
) -> Vec<ReleaseEntry> {
    let Some(baseline) = server_baseline else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter(|entry| {
            compare_versions(baseline, &entry.minimum_server_baseline) != Ordering::Less
        })
        .collect()
}

/// Pick the release to offer from the eligible entries.
///
/// The entries are sorted oldest first; the oldest critical release newer
/// than `current_version` wins, otherwise the newest release overall.
#[must_use]
pub fn pick_candidate(
    mut eligible: Vec<ReleaseEntry>,
    current_version: &str,
) -> Option<ReleaseEntry> {
    // sort_by is stable, so equal versions keep their feed order.
    eligible.sort_by(|a, b| compare_versions(&a.version, &b.version));

    let critical = eligible.iter().position(|entry| {
        entry.critical && compare_versions(current_version, &entry.version) == Ordering::Less
    });

    match critical {
        Some(index) => Some(eligible.swap_remove(index)),
        None => eligible.pop(),
    }
}

/// Filter by server baseline and pick a candidate.
///
/// `None` means no entry survived filtering.
#[must_use]
pub fn select_candidate(
    entries: Vec<ReleaseEntry>,
    server_baseline: Option<&str>,
    current_version: &str,
) -> Option<ReleaseEntry> {
    pick_candidate(filter_eligible(entries, server_baseline), current_version)
}

/// Whether `candidate` is actually newer than the installed version.
#[must_use]
pub fn offers_update(candidate: &ReleaseEntry, current_version: &str) -> bool {
    candidate.is_valid() && compare_versions(current_version, &candidate.version) == Ordering::Less
}

//! Dataset cleaning: canonical states, no unresolvable or duplicate rows,
//! no missing counts.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::canonical::{clean_state, is_canonical, UNKNOWN};
use crate::types::{CleanRecord, DatasetKind, RawRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub original_rows: usize,
    pub states_before: usize,
    pub states_after: usize,
    pub unknown_removed: usize,
    pub duplicates_removed: usize,
    /// Rows kept under a best-effort title-cased name outside the canonical set.
    pub non_canonical_rows: usize,
    pub final_rows: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub kind: DatasetKind,
    pub records: Vec<CleanRecord>,
    pub report: CleanReport,
}

/// Clean one kind's concatenated rows. Kept rows stay in input order.
pub fn clean_dataset(kind: DatasetKind, mut rows: Vec<RawRecord>) -> CleanedDataset {
    let original_rows = rows.len();
    let states_before = rows
        .iter()
        .filter_map(|r| r.state.as_deref())
        .collect::<HashSet<_>>()
        .len();

    for r in &mut rows {
        r.state = Some(clean_state(r.state.as_deref()));
    }
    let states_after = rows
        .iter()
        .filter_map(|r| r.state.as_deref())
        .collect::<HashSet<_>>()
        .len();

    rows.retain(|r| r.state.as_deref() != Some(UNKNOWN));
    let unknown_removed = original_rows - rows.len();
    if unknown_removed > 0 {
        debug!(%kind, unknown_removed, "dropped rows with unresolvable state");
    }

    let before_dedup = rows.len();
    let mut seen: HashSet<RawRecord> = HashSet::with_capacity(rows.len());
    rows.retain(|r| seen.insert(r.clone()));
    let duplicates_removed = before_dedup - rows.len();

    let records: Vec<CleanRecord> = rows
        .into_iter()
        .map(|r| {
            CleanRecord::new(
                r.date,
                r.state.unwrap_or_else(|| UNKNOWN.to_string()),
                r.district,
                r.pincode,
                r.counts.into_iter().map(|c| c.unwrap_or(0)).collect(),
            )
        })
        .collect();

    let non_canonical_rows = records.iter().filter(|r| !is_canonical(&r.state)).count();

    let report = CleanReport {
        original_rows,
        states_before,
        states_after,
        unknown_removed,
        duplicates_removed,
        non_canonical_rows,
        final_rows: records.len(),
    };
    info!(
        %kind,
        original = report.original_rows,
        states_before = report.states_before,
        states_after = report.states_after,
        unknown_removed = report.unknown_removed,
        duplicates_removed = report.duplicates_removed,
        final_rows = report.final_rows,
        "cleaned dataset"
    );

    CleanedDataset {
        kind,
        records,
        report,
    }
}

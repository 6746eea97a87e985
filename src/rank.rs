use crate::aggregate::{GroupLabel, Grouped, MetricValue};
use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub label: GroupLabel,
    pub value: MetricValue,
}

/// Groups ordered by descending value, at most `n` of them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct RankedResult {
    entries: Vec<RankedEntry>,
}

impl RankedResult {
    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupLabel, MetricValue)> {
        self.entries.iter().map(|entry| (&entry.label, entry.value))
    }
}

/// Keeps the `n` largest groups.
///
/// Equal values fall back to label order, so the result does not depend on
/// the iteration order of `grouped`.
pub fn top_n(grouped: Grouped, n: usize) -> RankedResult {
    let mut entries: Vec<RankedEntry> = grouped
        .into_iter()
        .map(|(label, value)| RankedEntry { label, value })
        .collect();
    entries.sort_by(compare_entries);
    entries.truncate(n);
    RankedResult { entries }
}

fn compare_entries(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.value
        .total_cmp(&a.value)
        .then_with(|| a.label.cmp(&b.label))
}

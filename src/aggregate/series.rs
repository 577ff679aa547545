use std::collections::BTreeMap;

use serde::Serialize;

/// One value of a segment decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledRtt {
    pub label: String,
    pub rtt: u64,
}

impl LabeledRtt {
    pub fn new(label: impl Into<String>, rtt: u64) -> Self {
        Self {
            label: label.into(),
            rtt,
        }
    }
}

/// Append-only per-segment time series for one session.
///
/// Every `append` carries the full label set of the session, so all
/// sequences stay the same length and index `k` of each sequence belongs
/// to the `k`-th flush. Serializes as `{ "C-0": [..], "0-1": [..], .. }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeriesStore {
    series: BTreeMap<String, Vec<u64>>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one value per label; unseen labels start a new sequence.
    pub fn append(&mut self, snapshot: &[LabeledRtt]) {
        for point in snapshot {
            self.series
                .entry(point.label.clone())
                .or_default()
                .push(point.rtt);
        }
    }

    /// Number of flushes recorded so far.
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn get(&self, label: &str) -> Option<&[u64]> {
        self.series.get(label).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

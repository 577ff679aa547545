use hdrhistogram::Histogram;
use serde::Serialize;

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

/// Percentile breakdown of one segment's emitted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileSet {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    /// Most recent flushed value, zero included.
    pub last: u64,
    /// Values that went into the percentiles (zeros are skipped).
    pub count: u64,
}

impl PercentileSet {
    /// Zero entries mean the segment was not measured at that flush and are
    /// left out. Values above 60 s saturate at the top of the range.
    pub fn from_values(values: &[u64]) -> Self {
        let last = values.last().copied().unwrap_or(0);

        let Ok(mut hist) = Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
        else {
            return Self::empty(last);
        };
        for &v in values.iter().filter(|v| **v > 0) {
            hist.saturating_record(v);
        }

        if hist.len() == 0 {
            return Self::empty(last);
        }

        Self {
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_percentile(50.0),
            p95: hist.value_at_percentile(95.0),
            p99: hist.value_at_percentile(99.0),
            last,
            count: hist.len(),
        }
    }

    fn empty(last: u64) -> Self {
        Self {
            min: 0,
            max: 0,
            mean: 0.0,
            p50: 0,
            p95: 0,
            p99: 0,
            last,
            count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

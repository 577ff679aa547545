use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::trace;

use super::error::AggregateError;
use super::event::MeasurementEvent;
use super::observer::ObserverSlot;
use super::series::{LabeledRtt, SeriesStore};

/// Per-flow aggregation state: one slot per observer position, a sample
/// counter and the emitted segment series.
///
/// `slots[i]` is always the observer configured at position `i`
/// (0 = client side). The slot vector is sized once and never resized.
#[derive(Debug)]
pub struct Session {
    session_type: String,
    client: Option<String>,
    server: Option<String>,

    slots: Vec<ObserverSlot>,
    smoothing: bool,

    /// Samples since the last flush.
    pending: u64,
    flush_threshold: u64,
    output: SeriesStore,

    samples_total: u64,
    created_at: DateTime<Utc>,
    last_event_at: DateTime<Utc>,
    last_event: Instant,
    /// Set by the registry when it drops this session from its map.
    evicted: bool,
}

impl Session {
    /// `observer_count` must be at least 1; the registry guarantees it.
    pub fn new(
        first: &MeasurementEvent,
        observer_count: usize,
        smoothing: bool,
        flush_threshold: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_type: first.session_type.clone(),
            client: first.addrs.first().cloned(),
            server: first.addrs.get(1).cloned(),
            slots: vec![ObserverSlot::default(); observer_count.max(1)],
            smoothing,
            pending: 0,
            flush_threshold,
            output: SeriesStore::new(),
            samples_total: 0,
            created_at: now,
            last_event_at: now,
            last_event: Instant::now(),
            evicted: false,
        }
    }

    /// Record one event from the observer at position `observer`.
    /// Non-measurement events only refresh the activity timestamp.
    ///
    /// An out-of-range position fails before any state changes.
    pub fn new_event(
        &mut self,
        event: &MeasurementEvent,
        observer: usize,
    ) -> Result<(), AggregateError> {
        if !event.is_measurement() {
            self.touch();
            return Ok(());
        }
        let slot_count = self.slots.len();
        let Some(slot) = self.slots.get_mut(observer) else {
            return Err(AggregateError::InvalidObserver {
                id: observer.to_string(),
                reason: format!("expected 0..{slot_count}"),
            });
        };
        slot.add_sample(event, self.smoothing);
        self.touch();
        self.samples_total += 1;

        self.pending += 1;
        if self.pending > self.flush_threshold {
            self.snapshot();
            self.pending = 0;
        }
        Ok(())
    }

    /// Split the path into segments from the current slot state.
    ///
    /// Yields `C-0`, one `{i-1}-{i}` per adjacent observer pair,
    /// `{N-1}-S` and finally `Full`. Inter-observer segments are the
    /// difference of cumulative left RTTs and are 0 while the downstream
    /// observer has not measured anything.
    pub fn decompose(&self) -> Vec<LabeledRtt> {
        let n = self.slots.len();
        let mut out = Vec::with_capacity(n + 2);

        out.push(LabeledRtt::new("C-0", self.slots[0].left_rtt));

        for (i, pair) in self.slots.windows(2).enumerate() {
            let (near, far) = (&pair[0], &pair[1]);
            let rtt = if far.left_rtt == 0 {
                0
            } else {
                far.left_rtt.saturating_sub(near.left_rtt)
            };
            out.push(LabeledRtt::new(format!("{}-{}", i, i + 1), rtt));
        }

        out.push(LabeledRtt::new(format!("{}-S", n - 1), self.slots[n - 1].right_rtt));
        out.push(LabeledRtt::new("Full", self.slots[0].full_rtt));
        out
    }

    /// Append one decomposition to the output series.
    pub fn snapshot(&mut self) {
        let point = self.decompose();
        trace!(flush = self.output.len() + 1, "session snapshot");
        self.output.append(&point);
    }

    /// Take a snapshot and hand back the full series.
    pub fn format(&mut self) -> SeriesStore {
        self.snapshot();
        self.output.clone()
    }

    /// Emitted series without taking a new snapshot.
    pub fn series(&self) -> &SeriesStore {
        &self.output
    }

    pub fn slots(&self) -> &[ObserverSlot] {
        &self.slots
    }

    pub fn session_type(&self) -> &str {
        &self.session_type
    }

    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn samples_total(&self) -> u64 {
        self.samples_total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_event_at(&self) -> DateTime<Utc> {
        self.last_event_at
    }

    pub fn last_event(&self) -> Instant {
        self.last_event
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted
    }

    pub(super) fn mark_evicted(&mut self) {
        self.evicted = true;
    }

    fn touch(&mut self) {
        self.last_event_at = Utc::now();
        self.last_event = Instant::now();
    }
}

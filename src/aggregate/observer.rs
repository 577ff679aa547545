use serde::Serialize;

use super::event::MeasurementEvent;
use super::smoothing::ewma;

/// Latest (optionally smoothed) RTT estimates from one observer position.
///
/// Zero means "never measured". An accumulator only ever moves from zero
/// to a measured value, never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObserverSlot {
    /// Cumulative RTT from the client up to this observer.
    pub left_rtt: u64,
    /// RTT from this observer to the server.
    pub right_rtt: u64,
    /// End-to-end RTT as measured by the initiator.
    pub full_rtt: u64,
}

impl ObserverSlot {
    /// Fold the present metrics of `event` into the accumulators.
    ///
    /// `full_rtt_responder` is deliberately left out: it samples the same
    /// end-to-end delay as the initiator-side metric and would count it twice.
    pub fn add_sample(&mut self, event: &MeasurementEvent, smoothing: bool) {
        fold(&mut self.left_rtt, event.left_rtt, smoothing);
        fold(&mut self.right_rtt, event.right_rtt, smoothing);
        fold(&mut self.full_rtt, event.full_rtt_initiator, smoothing);
    }
}

fn fold(stored: &mut u64, sample: Option<u64>, smoothing: bool) {
    match sample {
        Some(rtt) if smoothing => *stored = ewma(*stored, rtt),
        Some(rtt) => *stored = rtt,
        None => {}
    }
}

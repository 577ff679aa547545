use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::aggregate::{MeasurementEvent, SessionRegistry};

/// Connection type reported for synthetic sessions.
pub const SIM_TYPE: &str = "SIM";

// ─── Public entry point ──────────────────────────────────────────

/// Spawns one task per synthetic session. Every `tick` each task reports
/// one measurement per observer until `running` is cleared.
pub async fn run(
    registry: Arc<SessionRegistry>,
    running: Arc<AtomicBool>,
    sessions: u32,
    tick: Duration,
) {
    let observers = registry.config().observers;
    info!(sessions, observers, tick_ms = tick.as_millis() as u64, "simulator started");

    let mut handles = Vec::with_capacity(sessions as usize);
    for worker_id in 0..sessions {
        let registry = registry.clone();
        let running = running.clone();
        handles.push(tokio::spawn(async move {
            worker(worker_id, registry, running, observers, tick).await;
        }));
    }

    for h in handles {
        let _ = h.await;
    }
    info!("simulator stopped");
}

// ─── Path model ──────────────────────────────────────────────────

/// Base one-way-pair delays (μs) for the `observers + 1` segments of a
/// synthetic path, client side first.
struct PathModel {
    segments: Vec<u64>,
}

impl PathModel {
    fn random(rng: &mut StdRng, observers: usize) -> Self {
        Self {
            segments: (0..=observers).map(|_| rng.gen_range(500..20_000)).collect(),
        }
    }

    /// Event seen by observer `pos`: cumulative RTT towards the client and
    /// remaining RTT towards the server, each with ±10 % jitter.
    fn observe(&self, rng: &mut StdRng, session: &str, pos: usize) -> MeasurementEvent {
        let left: u64 = self.segments[..=pos].iter().map(|s| jitter(rng, *s)).sum();
        let right: u64 = self.segments[pos + 1..].iter().map(|s| jitter(rng, *s)).sum();

        let mut ev = MeasurementEvent::measurement(session)
            .with_type(SIM_TYPE)
            .with_left(left)
            .with_right(right);
        if pos == 0 {
            ev = ev.with_full(left + right);
        }
        ev
    }
}

fn jitter(rng: &mut StdRng, base: u64) -> u64 {
    let spread = (base / 10).max(1);
    base - spread + rng.gen_range(0..=2 * spread)
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    registry: Arc<SessionRegistry>,
    running: Arc<AtomicBool>,
    observers: usize,
    tick: Duration,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let session = format!("sim-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let path = PathModel::random(&mut rng, observers);

    let mut interval = tokio::time::interval(tick);
    while running.load(Ordering::Relaxed) {
        interval.tick().await;
        for pos in 0..observers {
            let ev = path.observe(&mut rng, &session, pos);
            if let Err(e) = registry.new_event(&ev, &pos.to_string()) {
                warn!(session = %session, error = %e, "simulated event rejected");
                return;
            }
        }
    }
}

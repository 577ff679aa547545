use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use super::error::AggregateError;
use super::event::{observer_index, MeasurementEvent};
use super::series::SeriesStore;
use super::session::Session;
use crate::stats::SessionSummary;

// ─── Configuration ───────────────────────────────────────────────

/// Knobs fixed at startup and shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Observer positions per session (N >= 1).
    pub observers: usize,
    /// EWMA smoothing on, or raw last-value-wins.
    pub smoothing: bool,
    /// A snapshot is emitted once more than this many samples arrived.
    pub flush_threshold: u64,
    /// Sessions idle for longer than this are evicted. `None` keeps them forever.
    pub idle_ttl: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            observers: 2,
            smoothing: true,
            flush_threshold: 63,
            idle_ttl: Some(Duration::from_secs(3600)),
        }
    }
}

/// Entry of the session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionId {
    pub id: String,
    #[serde(rename = "type")]
    pub session_type: String,
}

// ─── Registry ────────────────────────────────────────────────────

/// Session id → session map shared by all request handlers.
///
/// The map lock only covers lookup and insertion; each session carries its
/// own lock for mutation, so different sessions never contend.
pub struct SessionRegistry {
    config: AggregatorConfig,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Route one observer report to its session, creating the session on
    /// first sight.
    ///
    /// A measurement from an invalid sender is rejected before anything is
    /// touched: no session is created and no sample is recorded.
    pub fn new_event(&self, event: &MeasurementEvent, sender: &str) -> Result<(), AggregateError> {
        let observer = if event.is_measurement() {
            Some(observer_index(sender, self.config.observers)?)
        } else {
            None
        };

        let handle = self.get_or_create(event);
        self.ingest(handle, event, observer)
    }

    /// Apply `event` to the session behind `handle`.
    ///
    /// The eviction sweep may drop the session between lookup and locking;
    /// in that case the session is created again so the event lands
    /// somewhere a query can reach.
    fn ingest(
        &self,
        mut handle: Arc<Mutex<Session>>,
        event: &MeasurementEvent,
        observer: Option<usize>,
    ) -> Result<(), AggregateError> {
        loop {
            {
                let mut session = handle.lock();
                if !session.is_evicted() {
                    // lifecycle events only refresh the activity timestamp
                    session.new_event(event, observer.unwrap_or(0))?;
                    if let Some(index) = observer {
                        debug!(
                            session = %event.session,
                            observer = index,
                            left_rtt = ?event.left_rtt,
                            right_rtt = ?event.right_rtt,
                            full_rtt = ?event.full_rtt_initiator,
                            "measurement"
                        );
                    }
                    return Ok(());
                }
            }
            debug!(session = %event.session, "session evicted during ingest, recreating");
            handle = self.get_or_create(event);
        }
    }

    /// Take a snapshot of the session and return its full series.
    pub fn format_session(&self, id: &str) -> Result<SeriesStore, AggregateError> {
        let session = self.get(id)?;
        let series = session.lock().format();
        Ok(series)
    }

    /// Current series without appending a snapshot.
    pub fn series(&self, id: &str) -> Result<SeriesStore, AggregateError> {
        let session = self.get(id)?;
        let series = session.lock().series().clone();
        Ok(series)
    }

    pub fn summary(&self, id: &str) -> Result<SessionSummary, AggregateError> {
        let session = self.get(id)?;
        let session = session.lock();
        Ok(SessionSummary::from_session(id, &session))
    }

    /// Known sessions, in no particular order.
    pub fn list_sessions(&self) -> Vec<SessionId> {
        let sessions: Vec<_> = self
            .sessions
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();

        sessions
            .into_iter()
            .map(|(id, s)| SessionId {
                id,
                session_type: s.lock().session_type().to_owned(),
            })
            .collect()
    }

    /// Drop sessions whose last event is older than the idle TTL.
    /// Returns how many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let Some(ttl) = self.config.idle_ttl else {
            return 0;
        };

        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|id, s| {
            let mut session = s.lock();
            let idle = now.saturating_duration_since(session.last_event());
            let keep = idle <= ttl;
            if !keep {
                // in-flight ingests holding this handle will recreate the session
                session.mark_evicted();
                info!(session = %id, idle_secs = idle.as_secs(), "evicting idle session");
            }
            keep
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: &str) -> Result<Arc<Mutex<Session>>, AggregateError> {
        self.sessions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| AggregateError::NotFound(id.to_owned()))
    }

    fn get_or_create(&self, event: &MeasurementEvent) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(&event.session) {
            return existing.clone();
        }

        info!(
            session = %event.session,
            session_type = %event.session_type,
            observers = self.config.observers,
            "new session"
        );
        let session = Arc::new(Mutex::new(Session::new(
            event,
            self.config.observers,
            self.config.smoothing,
            self.config.flush_threshold,
        )));
        sessions.insert(event.session.clone(), session.clone());
        session
    }
}

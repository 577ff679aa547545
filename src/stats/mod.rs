//! Read-side statistics over a session's emitted segment series.

pub mod percentiles;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::session::Session;
pub use percentiles::PercentileSet;

/// Everything the dashboard shows for one session besides the raw series.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub session_type: String,
    pub client: Option<String>,
    pub server: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_event_at: DateTime<Utc>,
    pub samples_total: u64,
    pub flushes: usize,
    pub segments: BTreeMap<String, PercentileSet>,
}

impl SessionSummary {
    pub fn from_session(id: &str, session: &Session) -> Self {
        let series = session.series();
        Self {
            id: id.to_owned(),
            session_type: session.session_type().to_owned(),
            client: session.client().map(str::to_owned),
            server: session.server().map(str::to_owned),
            created_at: session.created_at(),
            last_event_at: session.last_event_at(),
            samples_total: session.samples_total(),
            flushes: series.len(),
            segments: series
                .iter()
                .map(|(label, values)| (label.to_owned(), PercentileSet::from_values(values)))
                .collect(),
        }
    }
}

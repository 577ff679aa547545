use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::aggregate::{SeriesStore, SessionId};
use crate::stats::SessionSummary;
use crate::AppState;

use super::AppError;

// ─── GET /demo ───────────────────────────────────────────────────

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionId>> {
    Json(state.registry.list_sessions())
}

// ─── GET /demo/:session ──────────────────────────────────────────
/// Snapshot the session and return every segment series.

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SeriesStore>, AppError> {
    Ok(Json(state.registry.format_session(&id)?))
}

// ─── GET /demo/:session/summary ──────────────────────────────────

pub async fn session_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(state.registry.summary(&id)?))
}

// ─── GET /demo/:session/stream ───────────────────────────────────
/// Server-Sent Events feed of the session's series.
/// Read-only: ticks never append a snapshot. Sends a `gone` event once if
/// the session is evicted while the stream is open.

pub async fn session_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // 404 up front rather than an empty stream
    state.registry.series(&id)?;

    let interval = tokio::time::interval(state.stream_interval);
    let mut gone = false;
    let stream = IntervalStream::new(interval)
        .map(move |_| match state.registry.series(&id) {
            Ok(series) => {
                let json = serde_json::to_string(&series).unwrap_or_default();
                Some(Event::default().data(json))
            }
            Err(_) if !gone => {
                gone = true;
                Some(Event::default().event("gone").data(id.clone()))
            }
            Err(_) => None,
        })
        .take_while(Option::is_some)
        .filter_map(|ev| ev.map(Ok));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

// ─── GET /health ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub sessions: usize,
    pub observers: usize,
    pub smoothing: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    let config = state.registry.config();
    Json(Health {
        status: "ok",
        sessions: state.registry.len(),
        observers: config.observers,
        smoothing: config.smoothing,
    })
}

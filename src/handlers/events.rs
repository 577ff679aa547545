use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::warn;

use crate::aggregate::MeasurementEvent;
use crate::AppState;

use super::AppError;

// ─── POST /data/:id ──────────────────────────────────────────────
/// Ingest one report from observer `id`.
///
/// Bodies that don't decode into a `MeasurementEvent` are rejected by the
/// `Json` extractor before they reach the registry.

pub async fn add_event(
    State(state): State<Arc<AppState>>,
    Path(sender): Path<String>,
    Json(event): Json<MeasurementEvent>,
) -> Result<StatusCode, AppError> {
    state.registry.new_event(&event, &sender).map_err(|e| {
        warn!(session = %event.session, sender = %sender, error = %e, "rejected event");
        AppError::from(e)
    })?;

    Ok(StatusCode::ACCEPTED)
}

pub mod events;
pub mod sessions;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::aggregate::AggregateError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
}

impl From<AggregateError> for AppError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::NotFound(_) => Self::NotFound(err.to_string()),
            AggregateError::InvalidObserver { .. } => Self::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({
            "error":  self.to_string(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_core_errors_to_status() {
        let not_found: AppError = AggregateError::NotFound("abc".into()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let bad: AppError = AggregateError::InvalidObserver {
            id: "9".into(),
            reason: "expected 0..2".into(),
        }
        .into();
        assert!(bad.to_string().contains("invalid observer id '9'"));
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

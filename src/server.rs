use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router`: ingestion, queries, optional static
/// visualizer.
pub fn create_router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        // ── Observer ingestion ──────────────────────────────────
        .route("/data/:id", post(handlers::events::add_event))
        // ── Session queries ─────────────────────────────────────
        .route("/demo", get(handlers::sessions::list_sessions))
        .route("/demo/:session", get(handlers::sessions::get_session))
        .route(
            "/demo/:session/summary",
            get(handlers::sessions::session_summary),
        )
        .route(
            "/demo/:session/stream",
            get(handlers::sessions::session_stream),
        )
        .route("/health", get(handlers::sessions::health))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregatorConfig, SessionRegistry};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(observers: usize, flush_threshold: u64) -> Router {
        let state = Arc::new(AppState {
            registry: Arc::new(SessionRegistry::new(AggregatorConfig {
                observers,
                smoothing: false,
                flush_threshold,
                idle_ttl: None,
            })),
            stream_interval: Duration::from_millis(10),
        });
        create_router(state, None)
    }

    async fn post_event(app: &Router, sender: &str, body: serde_json::Value) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/data/{sender}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn ingest_then_query_segments() {
        let app = app(2, 1);

        let events = [
            ("0", serde_json::json!({"Event": "measurement", "Type": "QUIC", "Session": "A", "Left_rtt": 10})),
            ("1", serde_json::json!({"Event": "measurement", "Type": "QUIC", "Session": "A", "Left_rtt": 25, "Right_rtt": 5})),
            ("0", serde_json::json!({"Event": "measurement", "Type": "QUIC", "Session": "A", "Full_rtt_initiator": 33})),
        ];
        for (sender, body) in events {
            let response = post_event(&app, sender, body).await;
            assert_eq!(response.status(), StatusCode::ACCEPTED);
            assert!(response.headers().contains_key("X-Response-Time-Us"));
        }

        let (status, listed) = get_json(&app, "/demo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, serde_json::json!([{ "id": "A", "type": "QUIC" }]));

        let (status, series) = get_json(&app, "/demo/A").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(series["C-0"], serde_json::json!([10, 10]));
        assert_eq!(series["0-1"], serde_json::json!([15, 15]));
        assert_eq!(series["1-S"], serde_json::json!([5, 5]));
        assert_eq!(series["Full"], serde_json::json!([0, 33]));

        let (status, summary) = get_json(&app, "/demo/A/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["samples_total"], 3);
        assert_eq!(summary["flushes"], 2);
        assert_eq!(summary["segments"]["0-1"]["last"], 15);
    }

    #[tokio::test]
    async fn rejects_invalid_sender() {
        let app = app(2, 1);
        let body = serde_json::json!({"Event": "measurement", "Session": "B", "Left_rtt": 10});

        for sender in ["2", "sd1"] {
            let response = post_event(&app, sender, body.clone()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        let (status, err) = get_json(&app, "/demo/B").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["status"], 404);
    }

    #[tokio::test]
    async fn rejects_malformed_payload() {
        let app = app(2, 1);
        let response = post_event(&app, "0", serde_json::json!({"Left_rtt": "fast"})).await;
        assert!(response.status().is_client_error());

        let (_, listed) = get_json(&app, "/demo").await;
        assert_eq!(listed, serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app(2, 1);
        for uri in ["/demo/ghost", "/demo/ghost/summary", "/demo/ghost/stream"] {
            let (status, _) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn health_reports_configuration() {
        let app = app(3, 8);
        let (status, health) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["sessions"], 0);
        assert_eq!(health["observers"], 3);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let response = app(2, 1)
            .oneshot(
                Request::builder()
                    .uri("/demo")
                    .header("origin", "http://visualizer.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}

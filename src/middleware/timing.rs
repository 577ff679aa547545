use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Adds `X-Response-Time-Us` and `Server-Timing` headers and logs one line
/// per request.
///
/// Ingestion (`POST /data/..`) is logged at debug since observers post at
/// packet-ish rates; SSE streams are only logged when they open.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros() as u64;

    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    let status = response.status().as_u16();
    match status {
        400..=599 => warn!(%method, %path, status, us, "request failed"),
        _ if path.starts_with("/data/") => debug!(%method, %path, status, us, "ingest"),
        _ => info!(%method, %path, status, us, "request"),
    }

    response
}

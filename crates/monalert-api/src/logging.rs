//! Request log: one structured line per handled request.

use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

/// Request/response logging middleware: one line per completed request.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let resp = next.run(req).await;

    let size = resp.body().size_hint().exact();
    info!(
        %method,
        %path,
        status = resp.status().as_u16(),
        duration_us = start.elapsed().as_micros() as u64,
        size,
        "handled request"
    );
    resp
}

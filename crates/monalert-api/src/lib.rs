//! monalert-api: HTTP surface of the metrics server.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/update/{kind}/{name}/{value}` | Path-encoded update, plain-text result |
//! | POST | `/update` | JSON update, JSON result |
//! | GET | `/value/{kind}/{name}` | Plain-text value |
//! | POST | `/value` | JSON query, JSON result |
//! | GET | `/` | JSON listing of every metric |
//!
//! Every route sits behind the gzip transport codec and the request log.

pub mod compression;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod service;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

pub use error::ApiError;
pub use service::MetricService;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub service: MetricService,
}

/// Build the complete router with the transport codec and request logging.
pub fn build_router(service: MetricService) -> Router {
    let state = ApiState { service };

    Router::new()
        .route("/", get(handlers::list_metrics))
        .route("/update", post(handlers::update_from_json))
        .route("/update/", post(handlers::update_from_json))
        .route("/update/{kind}", post(handlers::update_without_name))
        .route("/update/{kind}/{name}", post(handlers::update_without_value))
        .route("/update/{kind}/{name}/{value}", post(handlers::update_from_path))
        .route("/value", post(handlers::value_from_json))
        .route("/value/", post(handlers::value_from_json))
        .route("/value/{kind}/{name}", get(handlers::value_from_path))
        .layer(middleware::from_fn(compression::gzip))
        .layer(middleware::from_fn(logging::request_logging))
        .with_state(state)
}

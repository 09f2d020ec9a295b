//! Protocol handlers: Parse → Validate → Apply → Respond.
//!
//! Path-encoded routes answer in plain text, JSON routes answer with the
//! same object shape they accept. Nothing reaches the service until it
//! has been turned into a validated [`MetricSample`] or query key.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use tracing::debug;

use monalert_core::{MetricKind, MetricSample, Metrics, ValidationError};

use crate::ApiState;
use crate::error::ApiError;

// ── Updates ───────────────────────────────────────────────────────

/// POST /update/{kind}/{name}/{value}
pub async fn update_from_path(
    State(state): State<ApiState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Result<String, ApiError> {
    let sample = MetricSample::parse(&kind, &name, &value)?;
    let stored = state.service.update(&sample).await?;
    Ok(stored.to_string())
}

/// POST /update/{kind}/{name}: the value segment is missing.
pub async fn update_without_value(Path((kind, _name)): Path<(String, String)>) -> ApiError {
    match kind.parse::<MetricKind>() {
        Err(e) => e.into(),
        Ok(_) => ValidationError::IncompletePath.into(),
    }
}

/// POST /update/{kind}: the name segment is missing.
pub async fn update_without_name(Path(_kind): Path<String>) -> ApiError {
    ApiError::MissingName
}

/// POST /update
pub async fn update_from_json(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Metrics>, ApiError> {
    let req = decode_json(&headers, &body)?;
    let sample = req.to_sample()?;
    let stored = state.service.update(&sample).await?;
    Ok(Json(Metrics::from_value(sample.name(), stored)))
}

// ── Queries ───────────────────────────────────────────────────────

/// GET /value/{kind}/{name}
pub async fn value_from_path(
    State(state): State<ApiState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<String, ApiError> {
    let kind: MetricKind = kind.parse().map_err(|_| ApiError::UnknownMetric)?;
    let value = state.service.value(kind, &name).await?;
    Ok(value.to_string())
}

/// POST /value
pub async fn value_from_json(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Metrics>, ApiError> {
    let req = decode_json(&headers, &body)?;
    let (kind, name) = req.query_key().map_err(|_| ApiError::UnknownMetric)?;
    let value = state.service.value(kind, name).await?;
    Ok(Json(Metrics::from_value(name, value)))
}

/// GET /
pub async fn list_metrics(State(state): State<ApiState>) -> Json<Vec<Metrics>> {
    Json(state.service.list().await)
}

// ── Helpers ───────────────────────────────────────────────────────

fn decode_json(headers: &HeaderMap, body: &[u8]) -> Result<Metrics, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let mime = content_type.split(';').next().unwrap_or("").trim();
    if !mime.eq_ignore_ascii_case("application/json") {
        return Err(ApiError::UnsupportedMediaType(content_type.to_string()));
    }

    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "cannot decode request JSON body");
        ApiError::Decode(e)
    })
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use monalert_state::{DurabilityManager, MetricStore, PersistMode};

    use crate::{MetricService, build_router};

    fn test_router() -> Router {
        let durability = DurabilityManager::new(MetricStore::new(), None, PersistMode::Synchronous);
        build_router(MetricService::new(durability))
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, String) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn path_update_routing_table() {
        let router = test_router();
        let cases = [
            ("/update/gauge/temperature/42.5", StatusCode::OK),
            ("/update/counter/test/42", StatusCode::OK),
            ("/update/gauge/temperature/nan", StatusCode::BAD_REQUEST),
            ("/update/gauge/temperature/nat", StatusCode::BAD_REQUEST),
            ("/update/gauge/temperature/inf", StatusCode::BAD_REQUEST),
            ("/update/counter/test/1.5", StatusCode::BAD_REQUEST),
            ("/update/foo/bar/10", StatusCode::BAD_REQUEST),
            ("/update/foo/bar", StatusCode::BAD_REQUEST),
            ("/update/gauge/temperature", StatusCode::BAD_REQUEST),
            ("/update/gauge", StatusCode::NOT_FOUND),
        ];
        for (uri, expected) in cases {
            let (status, body) = send(&router, post(uri)).await;
            assert_eq!(status, expected, "{uri}: {body}");
        }
    }

    #[tokio::test]
    async fn incomplete_path_differs_from_unsupported_kind() {
        let router = test_router();
        let (_, incomplete) = send(&router, post("/update/gauge/temperature")).await;
        let (_, unsupported) = send(&router, post("/update/foo/bar")).await;
        assert!(incomplete.contains("incomplete"), "{incomplete}");
        assert!(unsupported.contains("unsupported metric kind"), "{unsupported}");
    }

    #[tokio::test]
    async fn path_update_returns_stored_value() {
        let router = test_router();
        let (_, body) = send(&router, post("/update/counter/hits/5")).await;
        assert_eq!(body, "5");
        let (_, body) = send(&router, post("/update/counter/hits/7")).await;
        assert_eq!(body, "12");
        let (_, body) = send(&router, post("/update/gauge/temperature/42.5")).await;
        assert_eq!(body, "42.5");
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let router = test_router();
        let (status, _) = send(&router, get("/update/gauge/temperature/42.5")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let (status, _) = send(&router, post("/")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn path_value_query() {
        let router = test_router();
        send(&router, post("/update/gauge/temperature/42.5")).await;

        let (status, body) = send(&router, get("/value/gauge/temperature")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "42.5");

        let (status, _) = send(&router, get("/value/counter/temperature")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&router, get("/value/histogram/temperature")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn json_update_and_query() {
        let router = test_router();
        let (status, body) = send(
            &router,
            post_json("/update", r#"{"id":"hits","type":"counter","delta":5}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"id":"hits","type":"counter","delta":5}"#);

        let (_, body) = send(
            &router,
            post_json("/update/", r#"{"id":"hits","type":"counter","delta":7}"#),
        )
        .await;
        assert_eq!(body, r#"{"id":"hits","type":"counter","delta":12}"#);

        let (status, body) = send(&router, post_json("/value", r#"{"id":"hits","type":"counter"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"id":"hits","type":"counter","delta":12}"#);
    }

    #[tokio::test]
    async fn json_update_validation() {
        let router = test_router();
        let cases = [
            r#"{"id":"x","type":"gauge"}"#,
            r#"{"id":"","type":"gauge","value":1.0}"#,
            r#"{"id":"x","type":"meter","value":1.0}"#,
            r#"{"id":"x","type":"counter","delta":1.5}"#,
            r#"{"id":"x","type":"gauge","value":1.0,"extra":true}"#,
            r#"{"id":"x","#,
        ];
        for json in cases {
            let (status, body) = send(&router, post_json("/update", json)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{json}: {body}");
        }

        let (_, listing) = send(&router, get("/")).await;
        assert_eq!(listing, "[]");
    }

    #[tokio::test]
    async fn json_requires_json_content_type() {
        let router = test_router();
        let req = Request::builder()
            .method("POST")
            .uri("/update")
            .header("content-type", "text/plain")
            .body(Body::from(r#"{"id":"x","type":"gauge","value":1.0}"#))
            .unwrap();
        let (status, _) = send(&router, req).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let req = Request::builder()
            .method("POST")
            .uri("/value")
            .header("content-type", "application/json; charset=utf-8")
            .body(Body::from(r#"{"id":"x","type":"gauge"}"#))
            .unwrap();
        let (status, _) = send(&router, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn json_query_for_unknown_metric_is_not_found() {
        let router = test_router();
        let (status, _) = send(&router, post_json("/value", r#"{"id":"never","type":"gauge"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_returns_every_entry() {
        let router = test_router();
        send(&router, post("/update/gauge/b/1.5")).await;
        send(&router, post("/update/counter/a/2")).await;
        send(&router, post("/update/counter/a/3")).await;

        let (status, body) = send(&router, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        let listed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            listed,
            serde_json::json!([
                {"id": "a", "type": "counter", "delta": 5},
                {"id": "b", "type": "gauge", "value": 1.5}
            ])
        );
    }
}

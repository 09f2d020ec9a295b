//! Gzip transport codec.
//!
//! Orthogonal to the protocol: a request with `Content-Encoding: gzip` is
//! inflated before it reaches a handler, and a response to a client that
//! sent `Accept-Encoding: gzip` is deflated on the way out with the
//! `Content-Encoding` set and any precomputed `Content-Length` dropped.
//! A body that cannot be inflated fails with 500 before any validation.

use std::io::{Read, Write};

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;
use tracing::warn;

/// Upper bound for a request body, compressed or inflated.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot read body: {0}")]
    Body(#[source] axum::Error),

    #[error("gzip stream error: {0}")]
    Gzip(#[source] std::io::Error),

    #[error("inflated body exceeds {} bytes", MAX_BODY_BYTES)]
    TooLarge,
}

/// Middleware entry point, installed with `axum::middleware::from_fn`.
pub async fn gzip(req: Request, next: Next) -> Response {
    let accepts_gzip = has_token(req.headers(), header::ACCEPT_ENCODING, "gzip");

    let req = if has_token(req.headers(), header::CONTENT_ENCODING, "gzip") {
        match decompress_request(req).await {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "cannot decompress request body");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "cannot decompress request body",
                )
                    .into_response();
            }
        }
    } else {
        req
    };

    let resp = next.run(req).await;
    if !accepts_gzip || resp.headers().contains_key(header::CONTENT_ENCODING) {
        return resp;
    }

    match compress_response(resp).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(error = %e, "cannot compress response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn decompress_request(req: Request) -> Result<Request, CodecError> {
    let (mut parts, body) = req.into_parts();
    let compressed = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(CodecError::Body)?;
    let plain = gunzip(&compressed)?;

    parts.headers.remove(header::CONTENT_ENCODING);
    parts.headers.remove(header::CONTENT_LENGTH);
    Ok(Request::from_parts(parts, Body::from(plain)))
}

async fn compress_response(resp: Response) -> Result<Response, CodecError> {
    let (mut parts, body) = resp.into_parts();
    let plain = to_bytes(body, usize::MAX).await.map_err(CodecError::Body)?;
    if plain.is_empty() {
        return Ok(Response::from_parts(parts, Body::empty()));
    }

    let compressed = gzip_bytes(&plain)?;
    parts
        .headers
        .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .append(header::VARY, HeaderValue::from_static("accept-encoding"));
    Ok(Response::from_parts(parts, Body::from(compressed)))
}

/// Gzip-compress `data` at the default level.
pub fn gzip_bytes(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data).map_err(CodecError::Gzip)?;
    encoder.finish().map_err(CodecError::Gzip)
}

/// Inflate a gzip stream, refusing output larger than [`MAX_BODY_BYTES`].
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut plain = Vec::new();
    GzDecoder::new(data)
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut plain)
        .map_err(CodecError::Gzip)?;
    if plain.len() > MAX_BODY_BYTES {
        return Err(CodecError::TooLarge);
    }
    Ok(plain)
}

/// Whether a comma-separated header lists `token`, ignoring parameters
/// such as `;q=0.8`.
fn has_token(headers: &HeaderMap, name: HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|item| item.split(';').next())
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}

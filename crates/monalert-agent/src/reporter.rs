//! Reporter: drains the buffer and sends one HTTP call per sample.
//!
//! Each call gets its own connection and a bounded timeout. Transient
//! transport failures are retried by the [`RetryPolicy`]; anything else,
//! a non-2xx answer included, aborts the rest of the cycle and the
//! remaining samples are dropped.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::{Method, StatusCode, header};
use http_body_util::Full;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use monalert_core::{MetricSample, Metrics};

use crate::buffer::BatchBuffer;
use crate::collector::PollBatch;
use crate::retry::RetryPolicy;

const USER_AGENT: &str = concat!("monalert-agent/", env!("CARGO_PKG_VERSION"));

/// How a sample is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireEncoding {
    /// `POST /update/{kind}/{name}/{value}` with an empty body.
    #[default]
    Path,
    /// `POST /update` with a JSON object body.
    Json,
}

impl fmt::Display for WireEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireEncoding::Path => f.write_str("path"),
            WireEncoding::Json => f.write_str("json"),
        }
    }
}

impl FromStr for WireEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(WireEncoding::Path),
            "json" => Ok(WireEncoding::Json),
            other => Err(format!("expected \"path\" or \"json\", got {other:?}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("http transport error: {0}")]
    Http(#[source] hyper::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("server answered {0}")]
    Status(StatusCode),

    #[error("cannot build request: {0}")]
    Build(#[source] http::Error),

    #[error("cannot encode metric: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("cannot compress body: {0}")]
    Compress(#[source] io::Error),
}

impl SendError {
    /// Refused, reset, or cut-short connections are worth another attempt.
    /// Timeouts, HTTP statuses and local failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SendError::Connect { source, .. } => is_transient(source.kind()),
            SendError::Http(e) => {
                e.is_incomplete_message() || e.is_closed() || io_kind(e).is_some_and(is_transient)
            }
            _ => false,
        }
    }
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
    )
}

/// Kind of the first `io::Error` in the source chain.
fn io_kind(err: &(dyn std::error::Error + 'static)) -> Option<io::ErrorKind> {
    let mut current = err.source();
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            return Some(io.kind());
        }
        current = e.source();
    }
    None
}

/// An encoded request, rebuilt cheaply for every attempt.
#[derive(Debug, Clone)]
struct Outbound {
    path: String,
    content_type: &'static str,
    gzip: bool,
    body: Bytes,
}

pub struct Reporter {
    addr: String,
    encoding: WireEncoding,
    gzip: bool,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Reporter {
    /// `addr` is `host:port`; a leading `http://` is accepted and ignored.
    pub fn new(addr: impl Into<String>, encoding: WireEncoding) -> Self {
        let addr = addr.into();
        let addr = addr
            .strip_prefix("http://")
            .unwrap_or(&addr)
            .trim_end_matches('/')
            .to_string();
        Self {
            addr,
            encoding,
            gzip: true,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    /// Gzip JSON bodies. Path-encoded requests have no body to compress.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one sample, retrying transient failures.
    pub async fn send_sample(&self, sample: &MetricSample) -> Result<(), SendError> {
        let out = self.prepare(sample)?;
        self.retry
            .run(|| self.attempt(&out), SendError::is_retryable)
            .await
    }

    /// Send every sample of every batch in order. The first failure aborts
    /// the rest; the number of samples delivered before it is logged.
    pub async fn report(&self, batches: &[PollBatch]) -> Result<usize, SendError> {
        let total: usize = batches.iter().map(|b| b.samples.len()).sum();
        let mut sent = 0;
        for batch in batches {
            for sample in &batch.samples {
                if let Err(e) = self.send_sample(sample).await {
                    warn!(
                        seq = batch.seq,
                        name = sample.name(),
                        sent,
                        dropped = total - sent,
                        error = %e,
                        "report cycle aborted"
                    );
                    return Err(e);
                }
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Report every `interval` from `buffer` until shutdown.
    pub async fn run(
        &self,
        buffer: BatchBuffer,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            addr = %self.addr,
            encoding = %self.encoding,
            interval_ms = interval.as_millis() as u64,
            "reporter started"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let batches = buffer.swap().await;
                    if batches.is_empty() {
                        continue;
                    }
                    if let Ok(sent) = self.report(&batches).await {
                        debug!(batches = batches.len(), sent, "report cycle done");
                    }
                }
                _ = shutdown.changed() => {
                    info!("reporter shutting down");
                    break;
                }
            }
        }
    }

    fn prepare(&self, sample: &MetricSample) -> Result<Outbound, SendError> {
        match self.encoding {
            WireEncoding::Path => Ok(Outbound {
                path: format!("/update/{}/{}/{}", sample.kind(), sample.name(), sample.value()),
                content_type: "text/plain",
                gzip: false,
                body: Bytes::new(),
            }),
            WireEncoding::Json => {
                let json = serde_json::to_vec(&Metrics::from(sample)).map_err(SendError::Encode)?;
                let body = if self.gzip { gzip(&json)? } else { json };
                Ok(Outbound {
                    path: "/update".to_string(),
                    content_type: "application/json",
                    gzip: self.gzip,
                    body: Bytes::from(body),
                })
            }
        }
    }

    async fn attempt(&self, out: &Outbound) -> Result<(), SendError> {
        match tokio::time::timeout(self.timeout, self.send_once(out)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(self.timeout)),
        }
    }

    async fn send_once(&self, out: &Outbound) -> Result<(), SendError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| SendError::Connect {
                addr: self.addr.clone(),
                source,
            })?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(SendError::Http)?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "connection closed with error");
            }
        });

        let mut builder = http::Request::builder()
            .method(Method::POST)
            .uri(&out.path)
            .header(header::HOST, &self.addr)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT_ENCODING, "gzip")
            .header(header::CONTENT_TYPE, out.content_type);
        if out.gzip {
            builder = builder.header(header::CONTENT_ENCODING, "gzip");
        }
        let req = builder
            .body(Full::new(out.body.clone()))
            .map_err(SendError::Build)?;

        let resp = sender.send_request(req).await.map_err(SendError::Http)?;
        if !resp.status().is_success() {
            return Err(SendError::Status(resp.status()));
        }
        debug!(path = %out.path, status = resp.status().as_u16(), "sample delivered");
        Ok(())
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, SendError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(SendError::Compress)?;
    encoder.finish().map_err(SendError::Compress)
}

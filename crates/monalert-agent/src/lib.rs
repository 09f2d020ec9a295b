//! monalert-agent: samples runtime gauges and reports them to the server.
//!
//! # Architecture
//!
//! ```text
//! Collector ──poll tick──► BatchBuffer ──report tick──► Reporter ──HTTP──► server
//!   PollBatch{seq, samples}   push / swap                one call per sample,
//!                                                         bounded retry
//! ```
//!
//! The poll and report loops only meet at the buffer. Delivery is
//! at-most-once: a cycle that fails is logged and its samples dropped.

pub mod buffer;
pub mod collector;
pub mod config;
pub mod reporter;
pub mod retry;

pub use buffer::BatchBuffer;
pub use collector::{Collector, PollBatch};
pub use config::AgentConfig;
pub use reporter::{Reporter, SendError, WireEncoding};
pub use retry::{Backoff, RetryPolicy};

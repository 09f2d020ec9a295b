//! Agent settings: command-line flag, then environment, then default.

use std::time::Duration;

use clap::Parser;

use monalert_core::config::{layered, layered_with, parse_bool};
use monalert_core::{ConfigError, EnvSource};

use crate::reporter::WireEncoding;

#[derive(Debug, Default, Parser)]
#[command(name = "monalert-agent", about = "Monalert metrics agent", version)]
pub struct AgentArgs {
    /// Server address, host:port [env: ADDRESS]
    #[arg(short = 'a', long)]
    pub address: Option<String>,

    /// Seconds between polls [env: POLL_INTERVAL]
    #[arg(short = 'p', long)]
    pub poll_interval: Option<u64>,

    /// Seconds between reports [env: REPORT_INTERVAL]
    #[arg(short = 'r', long)]
    pub report_interval: Option<u64>,

    /// Wire encoding, path or json [env: ENCODING]
    #[arg(short = 'e', long)]
    pub encoding: Option<WireEncoding>,

    /// Gzip JSON request bodies [env: GZIP]
    #[arg(short = 'z', long)]
    pub gzip: Option<bool>,

    /// Per-request timeout in seconds [env: REQUEST_TIMEOUT]
    #[arg(short = 't', long)]
    pub request_timeout: Option<u64>,

    /// Log filter, e.g. info or debug [env: LOG_LEVEL]
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub address: String,
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub encoding: WireEncoding,
    pub gzip: bool,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl AgentConfig {
    pub fn resolve<E: EnvSource + ?Sized>(args: AgentArgs, env: &E) -> Result<Self, ConfigError> {
        let poll = layered(args.poll_interval, env, "POLL_INTERVAL", 2)?;
        let report = layered(args.report_interval, env, "REPORT_INTERVAL", 10)?;
        let timeout = layered(args.request_timeout, env, "REQUEST_TIMEOUT", 5)?;

        Ok(Self {
            address: layered(args.address, env, "ADDRESS", "localhost:8080".to_string())?,
            poll_interval: positive_secs("POLL_INTERVAL", poll)?,
            report_interval: positive_secs("REPORT_INTERVAL", report)?,
            encoding: layered(args.encoding, env, "ENCODING", WireEncoding::Path)?,
            gzip: layered_with(args.gzip, env, "GZIP", true, parse_bool)?,
            request_timeout: positive_secs("REQUEST_TIMEOUT", timeout)?,
            log_level: layered(args.log_level, env, "LOG_LEVEL", "info".to_string())?,
        })
    }
}

fn positive_secs(name: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            source_name: name.to_string(),
            value: secs.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

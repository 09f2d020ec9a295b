//! Server settings: command-line flag, then environment, then default.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use monalert_core::config::{layered, layered_with, parse_bool};
use monalert_core::{ConfigError, EnvSource};

#[derive(Debug, Default, Parser)]
#[command(name = "monalertd", about = "Monalert metrics server", version)]
pub struct ServerArgs {
    /// Listen address, host:port or :port [env: ADDRESS]
    #[arg(short = 'a', long)]
    pub address: Option<String>,

    /// Seconds between snapshots, 0 persists on every update [env: STORE_INTERVAL]
    #[arg(short = 'i', long)]
    pub store_interval: Option<u64>,

    /// Snapshot file, an empty value disables persistence [env: FILE_STORAGE_PATH]
    #[arg(short = 'f', long)]
    pub file_storage_path: Option<String>,

    /// Load the snapshot file on start [env: RESTORE]
    #[arg(short = 'r', long)]
    pub restore: Option<bool>,

    /// Log filter, e.g. info or debug [env: LOG_LEVEL]
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bindable `host:port`.
    pub address: String,
    pub store_interval: Duration,
    pub file_storage_path: Option<PathBuf>,
    pub restore: bool,
    pub log_level: String,
}

impl ServerConfig {
    pub fn resolve<E: EnvSource + ?Sized>(args: ServerArgs, env: &E) -> Result<Self, ConfigError> {
        let address = layered(args.address, env, "ADDRESS", "localhost:8080".to_string())?;
        let interval = layered(args.store_interval, env, "STORE_INTERVAL", 300)?;
        let path = layered(
            args.file_storage_path,
            env,
            "FILE_STORAGE_PATH",
            "/tmp/metrics-db.json".to_string(),
        )?;

        Ok(Self {
            address: normalize_listen_addr(&address),
            store_interval: Duration::from_secs(interval),
            file_storage_path: (!path.trim().is_empty()).then(|| PathBuf::from(path)),
            restore: layered_with(args.restore, env, "RESTORE", true, parse_bool)?,
            log_level: layered(args.log_level, env, "LOG_LEVEL", "info".to_string())?,
        })
    }
}

/// `:8080` listens on every interface; anything else is used as given.
pub fn normalize_listen_addr(addr: &str) -> String {
    let addr = addr.trim().strip_prefix("http://").unwrap_or(addr.trim());
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let cfg = ServerConfig::resolve(ServerArgs::default(), &env(&[])).unwrap();
        assert_eq!(cfg.address, "localhost:8080");
        assert_eq!(cfg.store_interval, Duration::from_secs(300));
        assert_eq!(cfg.file_storage_path, Some(PathBuf::from("/tmp/metrics-db.json")));
        assert!(cfg.restore);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn flag_beats_env_beats_default() {
        let vars = env(&[("STORE_INTERVAL", "0"), ("RESTORE", "false"), ("ADDRESS", ":9090")]);
        let cfg = ServerConfig::resolve(ServerArgs::default(), &vars).unwrap();
        assert_eq!(cfg.store_interval, Duration::ZERO);
        assert!(!cfg.restore);
        assert_eq!(cfg.address, "0.0.0.0:9090");

        let args = ServerArgs::parse_from(["monalertd", "-i", "30", "-r", "true", "-a", "127.0.0.1:1"]);
        let cfg = ServerConfig::resolve(args, &vars).unwrap();
        assert_eq!(cfg.store_interval, Duration::from_secs(30));
        assert!(cfg.restore);
        assert_eq!(cfg.address, "127.0.0.1:1");
    }

    #[test]
    fn empty_path_flag_disables_persistence() {
        let args = ServerArgs::parse_from(["monalertd", "-f", ""]);
        let cfg = ServerConfig::resolve(args, &env(&[])).unwrap();
        assert_eq!(cfg.file_storage_path, None);
    }

    #[test]
    fn malformed_env_is_an_error() {
        let err = ServerConfig::resolve(ServerArgs::default(), &env(&[("STORE_INTERVAL", "-5")]))
            .unwrap_err();
        assert!(err.to_string().contains("STORE_INTERVAL"));

        let err = ServerConfig::resolve(ServerArgs::default(), &env(&[("RESTORE", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("RESTORE"));
    }

    #[test]
    fn listen_addr_normalization() {
        assert_eq!(normalize_listen_addr(":8080"), "0.0.0.0:8080");
        assert_eq!(normalize_listen_addr("localhost:8080"), "localhost:8080");
        assert_eq!(normalize_listen_addr("http://127.0.0.1:80"), "127.0.0.1:80");
    }
}

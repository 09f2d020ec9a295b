//! Layered configuration resolution shared by the agent and the server.
//!
//! Each setting is resolved independently with a fixed precedence:
//! an explicitly passed command-line flag wins, then a non-empty
//! environment variable, then the built-in default.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::BuildHasher;
use std::str::FromStr;

use crate::error::ConfigError;

/// Source of environment variables.
pub trait EnvSource {
    /// Value of `key`, or `None` if unset or empty.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl<S: BuildHasher> EnvSource for HashMap<String, String, S> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Resolve a setting whose type implements `FromStr`.
pub fn layered<T, E>(flag: Option<T>, env: &E, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    E: EnvSource + ?Sized,
{
    layered_with(flag, env, key, default, |raw| {
        raw.parse::<T>().map_err(|e| e.to_string())
    })
}

/// Resolve a setting with a custom parser for the environment value.
pub fn layered_with<T, E, F>(
    flag: Option<T>,
    env: &E,
    key: &str,
    default: T,
    parse: F,
) -> Result<T, ConfigError>
where
    E: EnvSource + ?Sized,
    F: FnOnce(&str) -> Result<T, String>,
{
    if let Some(v) = flag {
        return Ok(v);
    }
    match env.var(key) {
        Some(raw) => parse(&raw).map_err(|reason| ConfigError::Invalid {
            source_name: key.to_string(),
            value: raw,
            reason,
        }),
        None => Ok(default),
    }
}

/// Lenient boolean parser: `1 t true yes on` / `0 f false no off`,
/// case-insensitive.
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Ok(true),
        "0" | "f" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}

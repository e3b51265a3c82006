//! Environment helpers shared by the per-module configuration types.

use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;

const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Returns the first of `keys` that is set to a non-empty value.
pub(crate) fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

pub(crate) fn env_or(keys: &[&str], default: &str) -> String {
    env_first(keys).unwrap_or_else(|| default.to_string())
}

pub(crate) fn env_required(key: &str) -> Result<String, ConfigError> {
    env_first(&[key]).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

/// Parses the first set variable of `keys`, falling back to `default` with a warning
/// when the value does not parse.
pub(crate) fn env_parse<T>(keys: &[&str], default: T) -> T
where
    T: FromStr + Display,
{
    match env_first(keys) {
        None => default,
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    "Invalid value for {}: {}. Using default '{}'",
                    keys[0],
                    raw,
                    default
                );
                default
            }
        },
    }
}

/// Bound applied to every call into a store or the identity provider.
pub(crate) fn upstream_timeout() -> Duration {
    let secs = env_parse(&["UPSTREAM_TIMEOUT_SECS"], DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if secs == 0 {
        tracing::warn!(
            "UPSTREAM_TIMEOUT_SECS must be positive. Using default '{}'",
            DEFAULT_UPSTREAM_TIMEOUT_SECS
        );
        return Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    }
    Duration::from_secs(secs)
}

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

use crate::config::{ConfigError, env_first, env_or, env_parse, upstream_timeout};

const DEFAULT_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_RP_NAME: &str = "Passkey Auth";
const DEFAULT_CHALLENGE_TTL: u64 = 60;
const MAX_CHALLENGE_TTL: u64 = 86_400;
const DEFAULT_TIMEOUT: u32 = 60;

/// WebAuthn `userVerification` requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
    Preferred,
    Discouraged,
}

impl FromStr for UserVerification {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "preferred" => Ok(Self::Preferred),
            "discouraged" => Ok(Self::Discouraged),
            _ => Err(ConfigError::Invalid {
                key: "PASSKEY_USER_VERIFICATION".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Preferred => write!(f, "preferred"),
            Self::Discouraged => write!(f, "discouraged"),
        }
    }
}

/// How the signature counter reported during authentication is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterPolicy {
    /// Reject a non-zero counter that does not exceed the stored non-zero counter.
    Strict,
    /// Accept whatever the authenticator reports.
    Lenient,
}

impl FromStr for CounterPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(ConfigError::Invalid {
                key: "PASSKEY_COUNTER_POLICY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CounterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

/// Relying-party settings and ceremony parameters.
#[derive(Debug, Clone)]
pub struct PasskeyConfig {
    /// Origin the browser reports in clientDataJSON, e.g. `https://app.example.com`.
    pub origin: String,
    pub rp_id: String,
    pub rp_name: String,
    /// Challenge lifetime in seconds.
    pub challenge_ttl: u64,
    /// Ceremony timeout offered to the browser, in seconds.
    pub timeout: u32,
    pub user_verification: UserVerification,
    pub counter_policy: CounterPolicy,
    /// Bound on every store and identity-provider call made while serving a request.
    pub upstream_timeout: Duration,
}

impl PasskeyConfig {
    /// Builds a configuration for `origin` with every other setting at its default.
    /// The RP ID is the host part of the origin.
    pub fn new(origin: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            origin: origin.trim_end_matches('/').to_string(),
            rp_id: rp_id_from_origin(origin)?,
            rp_name: DEFAULT_RP_NAME.to_string(),
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            timeout: DEFAULT_TIMEOUT,
            user_verification: UserVerification::Preferred,
            counter_policy: CounterPolicy::Strict,
            upstream_timeout: Duration::from_secs(10),
        })
    }

    /// Reads `ORIGIN`, `PASSKEY_RP_ID`, `PASSKEY_RP_NAME`, `PASSKEY_CHALLENGE_TTL`
    /// (or `CHALLENGE_TTL`), `PASSKEY_TIMEOUT`, `PASSKEY_USER_VERIFICATION`,
    /// `PASSKEY_COUNTER_POLICY` and `UPSTREAM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let origin = env_or(&["ORIGIN"], DEFAULT_ORIGIN);
        let mut config = Self::new(&origin)?;

        if let Some(rp_id) = env_first(&["PASSKEY_RP_ID"]) {
            config.rp_id = rp_id;
        }
        config.rp_name = env_or(&["PASSKEY_RP_NAME"], DEFAULT_RP_NAME);

        config.challenge_ttl = env_parse(
            &["PASSKEY_CHALLENGE_TTL", "CHALLENGE_TTL"],
            DEFAULT_CHALLENGE_TTL,
        );
        if config.challenge_ttl == 0 || config.challenge_ttl > MAX_CHALLENGE_TTL {
            tracing::warn!(
                "Challenge TTL must be between 1 and {} seconds, got {}. Using default '{}'",
                MAX_CHALLENGE_TTL,
                config.challenge_ttl,
                DEFAULT_CHALLENGE_TTL
            );
            config.challenge_ttl = DEFAULT_CHALLENGE_TTL;
        }

        config.timeout = env_parse(&["PASSKEY_TIMEOUT"], DEFAULT_TIMEOUT);
        config.user_verification = env_parse(
            &["PASSKEY_USER_VERIFICATION"],
            UserVerification::Preferred,
        );
        config.counter_policy = env_parse(&["PASSKEY_COUNTER_POLICY"], CounterPolicy::Strict);
        config.upstream_timeout = upstream_timeout();

        tracing::info!(
            origin = %config.origin,
            rp_id = %config.rp_id,
            challenge_ttl = config.challenge_ttl,
            counter_policy = %config.counter_policy,
            "Passkey configuration loaded"
        );
        Ok(config)
    }

    pub(crate) fn user_verification_required(&self) -> bool {
        self.user_verification == UserVerification::Required
    }
}

fn rp_id_from_origin(origin: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: "ORIGIN".to_string(),
        value: origin.to_string(),
    };
    let url = url::Url::parse(origin).map_err(|_| invalid())?;
    url.host_str().map(str::to_string).ok_or_else(invalid)
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::IdpError;

/// Tokens issued by the identity provider for a verified subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub session_state: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, rename = "not-before-policy")]
    pub not_before_policy: Option<i64>,
}

/// Hands a verified email over to the identity provider and returns its tokens.
///
/// Implementations create the provider-side user on first use.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn exchange(&self, email: &str) -> Result<TokenBundle, IdpError>;
}

#[derive(Debug, Deserialize)]
pub(super) struct AccessTokenResponse {
    pub(super) access_token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct KeycloakUser {
    pub(super) id: String,
}

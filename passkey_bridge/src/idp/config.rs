use std::time::Duration;

use crate::config::{ConfigError, env_first, env_required, upstream_timeout};

/// Connection settings for a Keycloak realm.
#[derive(Clone)]
pub struct KeycloakConfig {
    /// Server root without a trailing slash, e.g. `http://localhost:8080`
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    /// Master realm admin credentials. Without them the client token calls the admin API.
    pub admin_credentials: Option<(String, String)>,
    /// Per-request timeout of the HTTP client
    pub timeout: Duration,
}

impl std::fmt::Debug for KeycloakConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakConfig")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("admin_credentials", &self.admin_credentials.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl KeycloakConfig {
    pub fn new(
        base_url: &str,
        realm: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            realm: realm.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            admin_credentials: None,
            timeout: upstream_timeout(),
        })
    }

    pub fn with_admin_credentials(mut self, username: &str, password: &str) -> Self {
        self.admin_credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Reads `KEYCLOAK_URL`, `KEYCLOAK_REALM`, `KEYCLOAK_CLIENT_ID`, `KEYCLOAK_CLIENT_SECRET`
    /// and, when both are set, `KEYCLOAK_ADMIN_USERNAME` / `KEYCLOAK_ADMIN_PASSWORD`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(
            &env_required("KEYCLOAK_URL")?,
            &env_required("KEYCLOAK_REALM")?,
            &env_required("KEYCLOAK_CLIENT_ID")?,
            &env_required("KEYCLOAK_CLIENT_SECRET")?,
        )?;

        match (
            env_first(&["KEYCLOAK_ADMIN_USERNAME"]),
            env_first(&["KEYCLOAK_ADMIN_PASSWORD"]),
        ) {
            (Some(username), Some(password)) => {
                config = config.with_admin_credentials(&username, &password);
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Only one of KEYCLOAK_ADMIN_USERNAME / KEYCLOAK_ADMIN_PASSWORD is set. Using the client token for the admin API"
                );
            }
            (None, None) => {}
        }

        tracing::debug!(?config, "Keycloak configuration loaded");
        Ok(config)
    }

    pub(super) fn token_url(&self, realm: &str) -> String {
        format!("{}/realms/{}/protocol/openid-connect/token", self.base_url, realm)
    }

    pub(super) fn users_url(&self) -> String {
        format!("{}/admin/realms/{}/users", self.base_url, self.realm)
    }
}

fn validate_base_url(base_url: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(base_url).map_err(|_| ConfigError::Invalid {
        key: "KEYCLOAK_URL".to_string(),
        value: base_url.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            key: "KEYCLOAK_URL".to_string(),
            value: base_url.to_string(),
        });
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

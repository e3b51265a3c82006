use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header::LOCATION};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::config::KeycloakConfig;
use super::errors::IdpError;
use super::types::{AccessTokenResponse, KeycloakUser, TokenBundle, TokenProvider};

const GRANT_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const TOKEN_TYPE_ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";
const ADMIN_CLIENT_ID: &str = "admin-cli";
const MASTER_REALM: &str = "master";

/// [`TokenProvider`] backed by Keycloak's admin API and token exchange.
#[derive(Debug, Clone)]
pub struct KeycloakTokenProvider {
    config: KeycloakConfig,
    client: Client,
}

fn get_client(timeout: Duration) -> Result<Client, IdpError> {
    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| IdpError::Config(format!("Failed to create HTTP client: {e}")))
}

impl KeycloakTokenProvider {
    pub fn new(config: KeycloakConfig) -> Result<Self, IdpError> {
        let client = get_client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn client_token(&self) -> Result<String, IdpError> {
        let response = self
            .client
            .post(self.config.token_url(&self.config.realm))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let token: AccessTokenResponse = read_json(response, "client token").await?;
        Ok(token.access_token)
    }

    async fn admin_token(&self, client_token: &str) -> Result<String, IdpError> {
        let Some((username, password)) = &self.config.admin_credentials else {
            return Ok(client_token.to_string());
        };

        let response = self
            .client
            .post(self.config.token_url(MASTER_REALM))
            .form(&[
                ("grant_type", "password"),
                ("client_id", ADMIN_CLIENT_ID),
                ("username", username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await?;

        let token: AccessTokenResponse = read_json(response, "admin token").await?;
        Ok(token.access_token)
    }

    async fn find_user(&self, admin_token: &str, email: &str) -> Result<Option<String>, IdpError> {
        let response = self
            .client
            .get(self.config.users_url())
            .bearer_auth(admin_token)
            .query(&[("email", email), ("exact", "true")])
            .send()
            .await?;

        let users: Vec<KeycloakUser> = read_json(response, "user lookup").await?;
        Ok(users.into_iter().next().map(|u| u.id))
    }

    async fn create_user(&self, admin_token: &str, email: &str) -> Result<String, IdpError> {
        let response = self
            .client
            .post(self.config.users_url())
            .bearer_auth(admin_token)
            .json(&json!({
                "username": email,
                "email": email,
                "enabled": true,
                "emailVerified": true,
                "attributes": { "passkey_user": ["true"] },
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        IdpError::InvalidResponse("User created without Location header".into())
                    })?;
                user_id_from_location(location)
            }
            StatusCode::CONFLICT => {
                tracing::debug!("User already exists at identity provider, looking it up again");
                self.find_user(admin_token, email).await?.ok_or_else(|| {
                    IdpError::InvalidResponse("User conflict but lookup found nothing".into())
                })
            }
            status => Err(IdpError::Status {
                endpoint: "user create".to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn exchange_for_user(
        &self,
        client_token: &str,
        user_id: &str,
    ) -> Result<TokenBundle, IdpError> {
        let response = self
            .client
            .post(self.config.token_url(&self.config.realm))
            .form(&[
                ("grant_type", GRANT_TOKEN_EXCHANGE),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("subject_token", client_token),
                ("requested_subject", user_id),
                ("requested_token_type", TOKEN_TYPE_ACCESS_TOKEN),
                ("requested_audience", self.config.client_id.as_str()),
            ])
            .send()
            .await?;

        read_json(response, "token exchange").await
    }
}

#[async_trait]
impl TokenProvider for KeycloakTokenProvider {
    #[tracing::instrument(skip(self), fields(realm = %self.config.realm))]
    async fn exchange(&self, email: &str) -> Result<TokenBundle, IdpError> {
        let client_token = self.client_token().await?;
        let admin_token = self.admin_token(&client_token).await?;

        let user_id = match self.find_user(&admin_token, email).await? {
            Some(id) => id,
            None => {
                let id = self.create_user(&admin_token, email).await?;
                tracing::info!(idp_user_id = %id, "Created user at identity provider");
                id
            }
        };

        let tokens = self.exchange_for_user(&client_token, &user_id).await?;
        tracing::debug!(idp_user_id = %user_id, "Token exchange completed");
        Ok(tokens)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, IdpError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(endpoint, %status, %body, "Identity provider request failed");
        return Err(IdpError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| IdpError::InvalidResponse(format!("{endpoint}: {e}")))
}

/// The created user's id is the last path segment of the `Location` header.
fn user_id_from_location(location: &str) -> Result<String, IdpError> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IdpError::InvalidResponse(format!("Unexpected Location: {location}")))
}

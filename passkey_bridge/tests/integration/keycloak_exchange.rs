use std::sync::Arc;
use std::time::Duration;

use passkey_bridge::{
    CoordinationError, IdpError, KeycloakConfig, KeycloakTokenProvider, TokenProvider,
};

use crate::common::mock_keycloak::{CLIENT_ID, CLIENT_SECRET, REALM};
use crate::common::{MockKeycloak, SoftAuthenticator, challenge_of, config, setup_with, verify_request};

async fn provider(mock: &MockKeycloak) -> KeycloakTokenProvider {
    let base_url = mock.start().await;
    let mut config = KeycloakConfig::new(&base_url, REALM, CLIENT_ID, CLIENT_SECRET).unwrap();
    config.timeout = Duration::from_secs(5);
    KeycloakTokenProvider::new(config).unwrap()
}

#[tokio::test]
async fn test_exchange_creates_missing_user() {
    // Given a realm without the user
    let mock = MockKeycloak::default();
    let provider = provider(&mock).await;

    // When exchanging for a new email
    let tokens = provider.exchange("bob@example.com").await.unwrap();

    // Then the user was created as a passkey user and tokens issued for it
    let state = mock.state.lock().unwrap();
    let id = state.users.get("bob@example.com").cloned().unwrap();
    assert_eq!(tokens.access_token, format!("access-{id}"));
    assert_eq!(tokens.refresh_token, Some(format!("refresh-{id}")));
    assert_eq!(tokens.not_before_policy, Some(0));
    assert_eq!(state.created.len(), 1);
    assert_eq!(state.created[0]["username"], "bob@example.com");
    assert_eq!(state.created[0]["emailVerified"], true);
    assert_eq!(state.created[0]["attributes"]["passkey_user"][0], "true");
    assert_eq!(state.exchanged, vec![id]);
}

#[tokio::test]
async fn test_exchange_reuses_existing_user() {
    let mock = MockKeycloak::default();
    let id = mock.seed_user("carol@example.com");
    let provider = provider(&mock).await;

    let tokens = provider.exchange("carol@example.com").await.unwrap();

    assert_eq!(tokens.access_token, format!("access-{id}"));
    assert!(mock.state.lock().unwrap().created.is_empty());
}

#[tokio::test]
async fn test_exchange_recovers_from_create_conflict() {
    // Given a user the first lookup does not see
    let mock = MockKeycloak::default();
    let id = mock.seed_user("dave@example.com");
    mock.state.lock().unwrap().hide_users_once = true;
    let provider = provider(&mock).await;

    // When exchanging, creation answers 409
    let tokens = provider.exchange("dave@example.com").await.unwrap();

    // Then the user is looked up again and used
    assert_eq!(tokens.access_token, format!("access-{id}"));
    assert!(mock.state.lock().unwrap().created.is_empty());
}

#[tokio::test]
async fn test_exchange_with_wrong_secret_is_status_error() {
    let mock = MockKeycloak::default();
    let base_url = mock.start().await;
    let config = KeycloakConfig::new(&base_url, REALM, CLIENT_ID, "wrong").unwrap();
    let provider = KeycloakTokenProvider::new(config).unwrap();

    let result = provider.exchange("erin@example.com").await;

    assert!(matches!(result, Err(IdpError::Status { status: 401, .. })));
}

#[tokio::test]
async fn test_full_flow_against_keycloak() {
    // Given an orchestrator wired to the mock realm
    let mock = MockKeycloak::default();
    let tokens = Arc::new(provider(&mock).await);
    let ctx = setup_with(config(), tokens);
    let authenticator = SoftAuthenticator::new();

    // When registering and then authenticating
    let init = ctx.orchestrator.initiate("frank@example.com").await.unwrap();
    let response = authenticator.register(&challenge_of(&init));
    let registered = ctx
        .orchestrator
        .verify(verify_request(&init, "frank@example.com", response))
        .await
        .unwrap();

    let init = ctx.orchestrator.initiate("frank@example.com").await.unwrap();
    let response = authenticator.assert(&challenge_of(&init), 1, &init.user_id);
    let authenticated = ctx
        .orchestrator
        .verify(verify_request(&init, "frank@example.com", response))
        .await
        .unwrap();

    // Then both return tokens for the same Keycloak user, created once
    assert_eq!(registered.tokens.access_token, authenticated.tokens.access_token);
    let state = mock.state.lock().unwrap();
    assert_eq!(state.created.len(), 1);
    assert_eq!(state.exchanged.len(), 2);
}

#[tokio::test]
async fn test_unreachable_keycloak_is_upstream_unavailable() {
    // Given a provider pointing at a closed port
    let mut kc = KeycloakConfig::new("http://127.0.0.1:9", REALM, CLIENT_ID, CLIENT_SECRET).unwrap();
    kc.timeout = Duration::from_secs(2);
    let ctx = setup_with(config(), Arc::new(KeycloakTokenProvider::new(kc).unwrap()));
    let authenticator = SoftAuthenticator::new();

    // When a registration otherwise succeeds
    let init = ctx.orchestrator.initiate("gina@example.com").await.unwrap();
    let response = authenticator.register(&challenge_of(&init));
    let result = ctx
        .orchestrator
        .verify(verify_request(&init, "gina@example.com", response))
        .await;

    // Then the failure surfaces as upstream unavailability
    assert!(matches!(
        result,
        Err(CoordinationError::UpstreamUnavailable(_))
    ));
}

//! Axum-based mock of the Keycloak endpoints the token provider talks to.
//!
//! Each test starts its own server on an ephemeral port so tests can run in parallel.

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

pub const REALM: &str = "myapp";
pub const CLIENT_ID: &str = "passkey-bridge";
pub const CLIENT_SECRET: &str = "bridge-secret";
const CLIENT_TOKEN: &str = "mock-client-token";

#[derive(Debug, Default)]
pub struct MockKeycloakState {
    /// email -> Keycloak user id
    pub users: HashMap<String, String>,
    /// Bodies of user create requests, in order
    pub created: Vec<Value>,
    /// `requested_subject` of each token exchange, in order
    pub exchanged: Vec<String>,
    /// Makes the next lookup miss an existing user, as in a create race
    pub hide_users_once: bool,
}

#[derive(Clone, Default)]
pub struct MockKeycloak {
    pub state: Arc<Mutex<MockKeycloakState>>,
}

impl MockKeycloak {
    /// Starts the server and returns its base URL.
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route(
                "/realms/{realm}/protocol/openid-connect/token",
                post(token_endpoint),
            )
            .route(
                "/admin/realms/{realm}/users",
                get(find_users).post(create_user),
            )
            .with_state(self.state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Keycloak");
        let addr = listener.local_addr().expect("Listener has an address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock Keycloak server failed");
        });
        format!("http://{addr}")
    }

    pub fn seed_user(&self, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.state
            .lock()
            .unwrap()
            .users
            .insert(email.to_string(), id.clone());
        id
    }
}

type Shared = State<Arc<Mutex<MockKeycloakState>>>;

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {CLIENT_TOKEN}"))
}

async fn token_endpoint(
    State(state): Shared,
    Path(realm): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if realm != REALM {
        return error(StatusCode::NOT_FOUND, "Realm does not exist");
    }
    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or_default();
    if field("client_id") != CLIENT_ID || field("client_secret") != CLIENT_SECRET {
        return error(StatusCode::UNAUTHORIZED, "invalid_client");
    }

    match field("grant_type") {
        "client_credentials" => Json(json!({
            "access_token": CLIENT_TOKEN,
            "expires_in": 300,
            "token_type": "Bearer",
        }))
        .into_response(),
        "urn:ietf:params:oauth:grant-type:token-exchange" => {
            if field("subject_token") != CLIENT_TOKEN {
                return error(StatusCode::UNAUTHORIZED, "invalid_token");
            }
            let requested = field("requested_subject").to_string();
            let mut state = state.lock().unwrap();
            if !state.users.values().any(|id| *id == requested) {
                return error(StatusCode::BAD_REQUEST, "invalid_request");
            }
            state.exchanged.push(requested.clone());
            Json(json!({
                "access_token": format!("access-{requested}"),
                "refresh_token": format!("refresh-{requested}"),
                "expires_in": 300,
                "refresh_expires_in": 1800,
                "token_type": "Bearer",
                "not-before-policy": 0,
                "session_state": Uuid::new_v4().to_string(),
                "scope": "openid email profile",
            }))
            .into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "unsupported_grant_type"),
    }
}

async fn find_users(
    State(state): Shared,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut state = state.lock().unwrap();
    if std::mem::take(&mut state.hide_users_once) {
        return Json(json!([])).into_response();
    }

    let email = params.get("email").cloned().unwrap_or_default();
    let users: Vec<Value> = state
        .users
        .get(&email)
        .map(|id| json!({ "id": id, "username": email, "email": email, "enabled": true }))
        .into_iter()
        .collect();
    Json(users).into_response()
}

async fn create_user(
    State(state): Shared,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    if state.users.contains_key(&email) {
        return error(StatusCode::CONFLICT, "User exists with same email");
    }

    let id = Uuid::new_v4().to_string();
    state.users.insert(email, id.clone());
    state.created.push(body);
    (
        StatusCode::CREATED,
        [(
            header::LOCATION,
            format!("http://keycloak/admin/realms/{realm}/users/{id}"),
        )],
    )
        .into_response()
}

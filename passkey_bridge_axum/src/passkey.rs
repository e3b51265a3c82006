use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

use passkey_bridge::{
    InitRequest, InitResponse, PasskeyOrchestrator, VerifyRequest, VerifyResponse,
};

use crate::error::{ErrorResponse, IntoResponseError, error_body};

pub(crate) fn router() -> Router<Arc<PasskeyOrchestrator>> {
    Router::new()
        .route("/init", post(handle_init))
        .route("/verify", post(handle_verify))
}

/// Unwraps the JSON body, answering 400 for anything that is not JSON.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ErrorResponse> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected request body");
        error_body(StatusCode::BAD_REQUEST, rejection.body_text())
    })
}

pub(crate) async fn handle_init(
    State(orchestrator): State<Arc<PasskeyOrchestrator>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<InitResponse>, ErrorResponse> {
    let request = InitRequest::try_from(json_body(body)?).into_response_error()?;

    let response = orchestrator
        .initiate(&request.email)
        .await
        .into_response_error()?;

    Ok(Json(response))
}

pub(crate) async fn handle_verify(
    State(orchestrator): State<Arc<PasskeyOrchestrator>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ErrorResponse> {
    let request = VerifyRequest::try_from(json_body(body)?).into_response_error()?;

    let response = orchestrator.verify(request).await.into_response_error()?;

    Ok(Json(response))
}

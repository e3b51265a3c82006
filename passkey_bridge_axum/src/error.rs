use axum::Json;
use http::StatusCode;
use passkey_bridge::CoordinationError;
use serde_json::{Value, json};

/// Status and `{"error": message}` body returned by every failing handler.
pub type ErrorResponse = (StatusCode, Json<Value>);

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, ErrorResponse>;
}

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (status, Json(json!({ "error": message.into() })))
}

fn status_and_message(error: &CoordinationError) -> (StatusCode, String) {
    match error {
        CoordinationError::InputValidation(_)
        | CoordinationError::ChallengeExpiredOrMissing
        | CoordinationError::ChallengeMismatch
        | CoordinationError::MalformedIdentifier(_)
        | CoordinationError::CredentialNotFound(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        // Details stay in the log
        CoordinationError::VerificationFailed(_) => (
            StatusCode::BAD_REQUEST,
            "Passkey verification failed".to_string(),
        ),
        CoordinationError::SubjectNotFound(_) => (StatusCode::NOT_FOUND, error.to_string()),
        CoordinationError::UpstreamUnavailable(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Upstream service unavailable".to_string(),
        ),
        CoordinationError::Unknown(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

impl<T> IntoResponseError<T> for Result<T, CoordinationError> {
    fn into_response_error(self) -> Result<T, ErrorResponse> {
        self.map_err(|e| {
            let (status, message) = status_and_message(&e);
            if status.is_server_error() {
                tracing::error!(%status, error = %e, "Request failed");
            } else {
                tracing::debug!(%status, error = %e, "Request rejected");
            }
            error_body(status, message)
        })
    }
}

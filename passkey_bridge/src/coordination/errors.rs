//! Error taxonomy surfaced by the orchestrator

use thiserror::Error;

use crate::idp::IdpError;
use crate::passkey::PasskeyError;
use crate::userdb::UserError;

/// Errors returned by [`PasskeyOrchestrator`](super::PasskeyOrchestrator) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// The request is missing a field or carries an unusable value
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Challenge not found or expired")]
    ChallengeExpiredOrMissing,

    #[error("Invalid challenge")]
    ChallengeMismatch,

    /// A credential identifier in the request has an unsupported shape
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// Any failed check on the authenticator response
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    /// A store or the identity provider failed or timed out
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl CoordinationError {
    /// Log the error and return self
    ///
    /// Allows explicit logging in a method chain: `Err(CoordinationError::ChallengeMismatch.log())`.
    pub fn log(self) -> Self {
        match &self {
            Self::InputValidation(msg) => tracing::error!("Invalid input: {}", msg),
            Self::ChallengeExpiredOrMissing => tracing::error!("Challenge not found or expired"),
            Self::ChallengeMismatch => tracing::error!("Invalid challenge"),
            Self::MalformedIdentifier(msg) => tracing::error!("Malformed identifier: {}", msg),
            Self::CredentialNotFound(id) => tracing::error!("Credential not found: {}", id),
            Self::VerificationFailed(msg) => tracing::error!("Verification failed: {}", msg),
            Self::SubjectNotFound(id) => tracing::error!("Subject not found: {}", id),
            Self::UpstreamUnavailable(msg) => tracing::error!("Upstream unavailable: {}", msg),
            Self::Unknown(msg) => tracing::error!("Unknown error: {}", msg),
        }
        self
    }
}

impl From<PasskeyError> for CoordinationError {
    fn from(err: PasskeyError) -> Self {
        let error = match err {
            PasskeyError::MalformedIdentifier(msg) => Self::MalformedIdentifier(msg),
            PasskeyError::CredentialNotFound(id) => Self::CredentialNotFound(id),
            PasskeyError::Storage(msg) => Self::UpstreamUnavailable(msg),
            e if e.is_verification_failure() => Self::VerificationFailed(e.to_string()),
            e => Self::Unknown(e.to_string()),
        };
        error.log()
    }
}

impl From<UserError> for CoordinationError {
    fn from(err: UserError) -> Self {
        let error = match err {
            UserError::NotFound => Self::SubjectNotFound("subject".to_string()),
            UserError::Storage(msg) => Self::UpstreamUnavailable(msg),
            UserError::InvalidData(msg) => Self::Unknown(msg),
        };
        error.log()
    }
}

impl From<IdpError> for CoordinationError {
    fn from(err: IdpError) -> Self {
        let error = match err {
            IdpError::Config(msg) => Self::Unknown(msg),
            e => Self::UpstreamUnavailable(e.to_string()),
        };
        error.log()
    }
}

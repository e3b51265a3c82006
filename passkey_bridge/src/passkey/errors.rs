use thiserror::Error;

use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum PasskeyError {
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("Client data error: {0}")]
    ClientData(String),

    #[error("Authenticator data error: {0}")]
    AuthenticatorData(String),

    #[error("Attestation error: {0}")]
    Attestation(String),

    #[error("Verification error: {0}")]
    Verification(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),
}

impl PasskeyError {
    /// True for every failure of the cryptographic or structural checks on an
    /// authenticator response.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::ClientData(_)
                | Self::AuthenticatorData(_)
                | Self::Attestation(_)
                | Self::Verification(_)
                | Self::Format(_)
        )
    }
}

impl From<StorageError> for PasskeyError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<UtilError> for PasskeyError {
    fn from(err: UtilError) -> Self {
        match err {
            UtilError::Crypto(msg) => Self::Crypto(msg),
            UtilError::Format(msg) => Self::Format(msg),
        }
    }
}

impl From<serde_json::Error> for PasskeyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

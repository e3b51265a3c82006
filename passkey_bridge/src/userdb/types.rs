use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use crate::passkey::{CredentialRecord, credential_to_value, normalize_credential_list};

use super::errors::UserError;

/// A person known by email, holding zero or more passkey credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    /// Opaque identifier, also used as the WebAuthn user handle
    pub id: String,
    pub email: String,
    pub credentials: Vec<CredentialRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(id: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            credentials: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Row shape shared by the SQLite and Postgres backends.
#[derive(Debug, FromRow)]
pub(super) struct SubjectRow {
    pub(super) id: String,
    pub(super) email: String,
    pub(super) credentials: String,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
}

impl SubjectRow {
    /// Malformed credential entries are dropped with a warning; the rest survive.
    pub(super) fn into_subject(self) -> Subject {
        let values = match serde_json::from_str::<Vec<Value>>(&self.credentials) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(subject_id = %self.id, error = %e, "Unreadable credential list");
                Vec::new()
            }
        };
        Subject {
            credentials: normalize_credential_list(&values),
            id: self.id,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Serializes credentials into the persisted JSON array.
pub(super) fn credentials_to_json(credentials: &[CredentialRecord]) -> Result<String, UserError> {
    let values = credentials
        .iter()
        .map(credential_to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| UserError::InvalidData(e.to_string()))?;
    Ok(serde_json::to_string(&values)?)
}

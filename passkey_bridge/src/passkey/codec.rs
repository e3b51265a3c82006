//! Credential identifier and public key normalization.
//!
//! Identifiers and keys cross three boundaries that disagree on representation: the
//! browser sends base64url text, older stored records hold standard base64 text or a
//! serialized byte buffer (`{"type":"Buffer","data":[...]}`), and the verification code
//! works on raw bytes. Everything enters through [`RawIdentifier`] and leaves as a
//! [`CanonicalId`]. Comparisons happen on canonical bytes only.

use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use std::fmt;

use crate::utils::{base64url_decode, base64url_encode};

use super::errors::PasskeyError;
use super::types::CredentialRecord;

/// A credential identifier or public key in any of the accepted representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawIdentifier {
    /// Base64 (standard or URL-safe, padding optional) or, failing that, plain UTF-8 text.
    Text(String),
    /// A bare byte sequence, serialized as a JSON array of integers.
    Bytes(Vec<u8>),
    /// A boxed byte array `{"type": "Buffer", "data": [...]}`.
    Boxed(Vec<u8>),
}

/// The one representation used after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalId {
    pub bytes: Vec<u8>,
    /// base64url without padding
    pub encoded: String,
}

impl CanonicalId {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let encoded = base64url_encode(&bytes);
        Self { bytes, encoded }
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl TryFrom<&Value> for RawIdentifier {
    type Error = PasskeyError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Array(items) => byte_array(items).map(Self::Bytes),
            Value::Object(map) => match (map.get("type"), map.get("data")) {
                (Some(Value::String(kind)), Some(Value::Array(items))) if kind == "Buffer" => {
                    byte_array(items).map(Self::Boxed)
                }
                _ => Err(PasskeyError::MalformedIdentifier(
                    "object is not a Buffer wrapper".to_string(),
                )),
            },
            other => Err(PasskeyError::MalformedIdentifier(format!(
                "unsupported {} value",
                json_kind(other)
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for RawIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RawIdentifier::try_from(&value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for RawIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bytes(bytes) => bytes.serialize(serializer),
            Self::Boxed(bytes) => json!({ "type": "Buffer", "data": bytes }).serialize(serializer),
        }
    }
}

fn byte_array(items: &[Value]) -> Result<Vec<u8>, PasskeyError> {
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| {
                    PasskeyError::MalformedIdentifier(format!("byte out of range: {item}"))
                })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decodes base64 in either alphabet, with or without padding.
pub(crate) fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let trimmed = text.trim_end_matches('=');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains(['+', '/']) {
        STANDARD_NO_PAD.decode(trimmed).ok()
    } else {
        base64url_decode(trimmed).ok()
    }
}

/// Normalizes any accepted representation to canonical bytes and their base64url text.
pub fn normalize(raw: &RawIdentifier) -> Result<CanonicalId, PasskeyError> {
    let bytes = match raw {
        RawIdentifier::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(PasskeyError::MalformedIdentifier(
                    "empty identifier".to_string(),
                ));
            }
            decode_base64(text).unwrap_or_else(|| text.as_bytes().to_vec())
        }
        RawIdentifier::Bytes(bytes) | RawIdentifier::Boxed(bytes) => bytes.clone(),
    };

    if bytes.is_empty() {
        return Err(PasskeyError::MalformedIdentifier(
            "empty identifier".to_string(),
        ));
    }
    Ok(CanonicalId::from_bytes(bytes))
}

/// Normalizes a stored public key. Besides the identifier forms, this unwraps keys
/// that were persisted as the text of a comma separated byte list (`"165,1,2,..."`).
pub fn normalize_public_key(raw: &RawIdentifier) -> Result<Vec<u8>, PasskeyError> {
    let bytes = normalize(raw)?.bytes;
    Ok(unwrap_csv_bytes(&bytes).unwrap_or(bytes))
}

fn unwrap_csv_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    if !bytes.contains(&b',') || !bytes.iter().all(|b| b.is_ascii_digit() || *b == b',') {
        return None;
    }
    std::str::from_utf8(bytes)
        .ok()?
        .split(',')
        .map(|n| n.parse::<u8>().ok())
        .collect()
}

/// Persisted shape of one credential inside a subject record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredCredential {
    pub(crate) id: RawIdentifier,
    pub(crate) public_key: RawIdentifier,
    #[serde(default)]
    pub(crate) counter: u32,
    #[serde(default)]
    pub(crate) created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) transports: Option<Vec<String>>,
}

impl StoredCredential {
    fn into_record(self) -> Result<CredentialRecord, PasskeyError> {
        Ok(CredentialRecord {
            id: normalize(&self.id)?,
            public_key: normalize_public_key(&self.public_key)?,
            counter: self.counter,
            transports: self.transports.filter(|t| !t.is_empty()),
            created_at: self.created.unwrap_or_default(),
        })
    }
}

impl From<&CredentialRecord> for StoredCredential {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            id: RawIdentifier::Text(record.id.encoded.clone()),
            public_key: RawIdentifier::Text(base64url_encode(&record.public_key)),
            counter: record.counter,
            created: Some(record.created_at),
            transports: record.transports.clone(),
        }
    }
}

/// Parses one stored credential entry.
pub(crate) fn credential_from_value(value: &Value) -> Result<CredentialRecord, PasskeyError> {
    let stored: StoredCredential = serde_json::from_value(value.clone())
        .map_err(|e| PasskeyError::MalformedIdentifier(e.to_string()))?;
    stored.into_record()
}

pub(crate) fn credential_to_value(record: &CredentialRecord) -> Result<Value, PasskeyError> {
    Ok(serde_json::to_value(StoredCredential::from(record))?)
}

/// Normalizes a list of stored credentials, skipping entries that cannot be read.
/// Later duplicates of an identifier are dropped as well.
pub fn normalize_credential_list(values: &[Value]) -> Vec<CredentialRecord> {
    let mut records: Vec<CredentialRecord> = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        match credential_from_value(value) {
            Ok(record) if records.iter().any(|r| r.id == record.id) => {
                tracing::warn!(index, credential_id = %record.id, "Skipping duplicate credential");
            }
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed credential");
            }
        }
    }
    records
}

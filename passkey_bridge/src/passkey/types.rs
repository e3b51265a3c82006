use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::codec::{CanonicalId, RawIdentifier};
use super::config::UserVerification;
use super::errors::PasskeyError;

/// Transports offered for a credential whose record does not name any.
pub(crate) const DEFAULT_TRANSPORTS: [&str; 4] = ["usb", "ble", "nfc", "internal"];

/// ES256 then RS256, in order of preference.
pub(crate) const SUPPORTED_ALGORITHMS: [i64; 2] = [-7, -257];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyType {
    Registration,
    Authentication,
}

impl CeremonyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Authentication => "authentication",
        }
    }
}

impl fmt::Display for CeremonyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CeremonyType {
    type Err = PasskeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(Self::Registration),
            "authentication" => Ok(Self::Authentication),
            other => Err(PasskeyError::Format(format!(
                "Unknown ceremony type: {other}"
            ))),
        }
    }
}

/// A registered credential in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: CanonicalId,
    /// COSE_Key bytes, or a raw uncompressed P-256 point for older records.
    pub public_key: Vec<u8>,
    pub counter: u32,
    /// `None` when the authenticator never reported its transports.
    pub transports: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn descriptor(&self) -> CredentialDescriptor {
        let transports = match &self.transports {
            Some(t) if !t.is_empty() => t.clone(),
            _ => DEFAULT_TRANSPORTS.iter().map(|t| t.to_string()).collect(),
        };
        CredentialDescriptor {
            id: self.id.encoded.clone(),
            type_: "public-key".to_string(),
            transports,
        }
    }
}

/// `PublicKeyCredentialDescriptor` used in allow and exclude lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub transports: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// base64url user handle
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub authenticator_attachment: String,
    pub resident_key: String,
    pub require_resident_key: bool,
    pub user_verification: UserVerification,
}

/// Options for `navigator.credentials.create()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Milliseconds
    pub timeout: u64,
    pub attestation: String,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
}

/// Options for `navigator.credentials.get()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    /// Milliseconds
    pub timeout: u64,
    pub rp_id: String,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: UserVerification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CeremonyOptions {
    Registration(RegistrationOptions),
    Authentication(AuthenticationOptions),
}

impl CeremonyOptions {
    pub fn challenge(&self) -> &str {
        match self {
            Self::Registration(o) => &o.challenge,
            Self::Authentication(o) => &o.challenge,
        }
    }
}

/// `PublicKeyCredential` returned by `navigator.credentials.create()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegistrationResponse {
    pub(crate) id: RawIdentifier,
    #[serde(default)]
    pub(crate) raw_id: Option<RawIdentifier>,
    pub(crate) response: AttestationResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub(crate) client_data_json: String,
    pub(crate) attestation_object: String,
    #[serde(default)]
    pub(crate) transports: Option<Vec<String>>,
}

/// `PublicKeyCredential` returned by `navigator.credentials.get()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthenticationResponse {
    pub(crate) id: RawIdentifier,
    #[serde(default)]
    pub(crate) raw_id: Option<RawIdentifier>,
    pub(crate) response: AssertionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub(crate) client_data_json: String,
    pub(crate) authenticator_data: String,
    pub(crate) signature: String,
    #[serde(default)]
    pub(crate) user_handle: Option<String>,
}

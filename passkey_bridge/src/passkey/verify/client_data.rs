use ring::digest;
use serde::Deserialize;

use crate::passkey::codec::decode_base64;
use crate::passkey::errors::PasskeyError;

pub(crate) const TYPE_CREATE: &str = "webauthn.create";
pub(crate) const TYPE_GET: &str = "webauthn.get";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebAuthnClientData {
    #[serde(rename = "type")]
    type_: String,
    challenge: String,
    origin: String,
    #[serde(default)]
    cross_origin: bool,
}

/// Decoded `clientDataJSON` together with the exact bytes the authenticator hashed.
#[derive(Debug)]
pub(crate) struct ParsedClientData {
    pub(crate) challenge: String,
    pub(crate) origin: String,
    pub(crate) type_: String,
    pub(crate) cross_origin: bool,
    pub(crate) raw_data: Vec<u8>,
}

impl ParsedClientData {
    pub(crate) fn from_base64(client_data_json: &str) -> Result<Self, PasskeyError> {
        let raw_data = decode_base64(client_data_json)
            .ok_or_else(|| PasskeyError::Format("Failed to decode clientDataJSON".into()))?;

        let data: WebAuthnClientData = serde_json::from_slice(&raw_data)
            .map_err(|e| PasskeyError::ClientData(format!("Invalid clientDataJSON: {e}")))?;

        Ok(Self {
            challenge: data.challenge,
            origin: data.origin,
            type_: data.type_,
            cross_origin: data.cross_origin,
            raw_data,
        })
    }

    pub(crate) fn verify(
        &self,
        expected_type: &str,
        expected_challenge: &str,
        expected_origin: &str,
    ) -> Result<(), PasskeyError> {
        if self.type_ != expected_type {
            return Err(PasskeyError::ClientData(format!(
                "Invalid type. Expected '{}', Got: {}",
                expected_type, self.type_
            )));
        }

        if self.challenge != expected_challenge {
            return Err(PasskeyError::ClientData(
                "Challenge mismatch. For more details, run with RUST_LOG=debug".into(),
            ));
        }

        if self.origin != expected_origin {
            return Err(PasskeyError::ClientData(format!(
                "Invalid origin. Expected: {}, Got: {}",
                expected_origin, self.origin
            )));
        }

        if self.cross_origin {
            return Err(PasskeyError::ClientData(
                "Cross-origin ceremonies are not accepted".into(),
            ));
        }

        Ok(())
    }

    pub(crate) fn hash(&self) -> digest::Digest {
        digest::digest(&digest::SHA256, &self.raw_data)
    }
}

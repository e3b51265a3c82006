use ciborium::value::Value as CborValue;
use webpki::EndEntityCert;

use crate::passkey::codec::decode_base64;
use crate::passkey::errors::PasskeyError;

use super::cose::{CredentialPublicKey, ES256, RS256, cbor_int, map_get_text};

/// The decoded `attestationObject`.
#[derive(Debug)]
pub(crate) struct AttestationObject {
    pub(crate) fmt: String,
    pub(crate) auth_data: Vec<u8>,
    pub(crate) att_stmt: Vec<(CborValue, CborValue)>,
}

impl AttestationObject {
    pub(crate) fn from_base64(attestation_object: &str) -> Result<Self, PasskeyError> {
        let bytes = decode_base64(attestation_object)
            .ok_or_else(|| PasskeyError::Format("Failed to decode attestation object".into()))?;

        let value: CborValue = ciborium::de::from_reader(&bytes[..])
            .map_err(|e| PasskeyError::Format(format!("Invalid attestation CBOR: {e}")))?;
        let CborValue::Map(map) = value else {
            return Err(PasskeyError::Format(
                "Attestation object is not a CBOR map".into(),
            ));
        };

        let mut fmt = None;
        let mut auth_data = None;
        let mut att_stmt = None;
        for (key, value) in map {
            match (key, value) {
                (CborValue::Text(k), CborValue::Text(v)) if k == "fmt" => fmt = Some(v),
                (CborValue::Text(k), CborValue::Bytes(v)) if k == "authData" => {
                    auth_data = Some(v)
                }
                (CborValue::Text(k), CborValue::Map(v)) if k == "attStmt" => att_stmt = Some(v),
                _ => {}
            }
        }

        match (fmt, auth_data, att_stmt) {
            (Some(fmt), Some(auth_data), Some(att_stmt)) => Ok(Self {
                fmt,
                auth_data,
                att_stmt,
            }),
            _ => Err(PasskeyError::Format(
                "Attestation object is missing fmt, authData or attStmt".into(),
            )),
        }
    }
}

/// Checks the attestation statement against the authenticator data and client data hash.
pub(crate) fn verify_attestation(
    attestation: &AttestationObject,
    credential_key: &CredentialPublicKey,
    client_data_hash: &[u8],
) -> Result<(), PasskeyError> {
    match attestation.fmt.as_str() {
        "none" => {
            tracing::debug!("Using 'none' attestation format");
            if attestation.att_stmt.is_empty() {
                Ok(())
            } else {
                Err(PasskeyError::Attestation(
                    "attStmt must be empty for 'none' attestation".into(),
                ))
            }
        }
        "packed" => {
            tracing::debug!("Using 'packed' attestation format");
            verify_packed(attestation, credential_key, client_data_hash)
        }
        other => Err(PasskeyError::Attestation(format!(
            "Unsupported attestation format: {other}"
        ))),
    }
}

fn verify_packed(
    attestation: &AttestationObject,
    credential_key: &CredentialPublicKey,
    client_data_hash: &[u8],
) -> Result<(), PasskeyError> {
    let stmt = &attestation.att_stmt;

    let alg = map_get_text(stmt, "alg")
        .and_then(cbor_int)
        .ok_or_else(|| PasskeyError::Attestation("Missing alg in attestation statement".into()))?;
    let sig = match map_get_text(stmt, "sig") {
        Some(CborValue::Bytes(sig)) => sig,
        _ => {
            return Err(PasskeyError::Attestation(
                "Missing sig in attestation statement".into(),
            ));
        }
    };

    let mut signed_data = Vec::with_capacity(attestation.auth_data.len() + client_data_hash.len());
    signed_data.extend_from_slice(&attestation.auth_data);
    signed_data.extend_from_slice(client_data_hash);

    if map_get_text(stmt, "ecdaaKeyId").is_some() {
        return Err(PasskeyError::Attestation(
            "ECDAA attestation not supported".into(),
        ));
    }

    match map_get_text(stmt, "x5c") {
        Some(CborValue::Array(certs)) => {
            tracing::debug!("Full attestation with certificate chain");
            let Some(CborValue::Bytes(leaf)) = certs.first() else {
                return Err(PasskeyError::Attestation("Empty x5c chain".into()));
            };
            let cert = EndEntityCert::try_from(leaf.as_slice()).map_err(|e| {
                PasskeyError::Attestation(format!(
                    "Failed to parse attestation certificate: {e:?}"
                ))
            })?;
            let algorithm = match alg {
                ES256 => &webpki::ECDSA_P256_SHA256,
                RS256 => &webpki::RSA_PKCS1_2048_8192_SHA256,
                other => {
                    return Err(PasskeyError::Attestation(format!(
                        "Unsupported attestation algorithm: {other}"
                    )));
                }
            };
            cert.verify_signature(algorithm, &signed_data, sig)
                .map_err(|_| PasskeyError::Attestation("Attestation signature invalid".into()))
        }
        Some(_) => Err(PasskeyError::Attestation("x5c must be an array".into())),
        None => {
            tracing::debug!("Self attestation");
            if alg != credential_key.algorithm() {
                return Err(PasskeyError::Attestation(format!(
                    "Self attestation alg {alg} does not match credential key"
                )));
            }
            credential_key
                .verify(&signed_data, sig)
                .map_err(|_| PasskeyError::Attestation("Self attestation signature invalid".into()))
        }
    }
}

use subtle::ConstantTimeEq;

use crate::passkey::codec::{CanonicalId, RawIdentifier, decode_base64, normalize};
use crate::passkey::config::{CounterPolicy, PasskeyConfig};
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{AuthenticationResponse, CredentialRecord};

use super::auth_data::AuthenticatorData;
use super::client_data::{ParsedClientData, TYPE_GET};
use super::cose::CredentialPublicKey;

/// Finds the stored credential whose canonical id matches the one the client claims.
pub(crate) fn find_credential<'a>(
    credentials: &'a [CredentialRecord],
    claimed: &CanonicalId,
) -> Result<&'a CredentialRecord, PasskeyError> {
    credentials
        .iter()
        .find(|c| c.id.bytes == claimed.bytes)
        .ok_or_else(|| PasskeyError::CredentialNotFound(claimed.encoded.clone()))
}

/// Resolves the counter to persist after a successful assertion.
///
/// Authenticators that do not keep a counter always report 0; the stored value is kept.
pub(crate) fn next_counter(
    stored: u32,
    reported: u32,
    policy: CounterPolicy,
) -> Result<u32, PasskeyError> {
    if reported == 0 {
        return Ok(stored);
    }
    if policy == CounterPolicy::Strict && stored != 0 && reported <= stored {
        tracing::warn!(stored, reported, "Signature counter did not increase");
        return Err(PasskeyError::Verification(
            "Signature counter did not increase, possible cloned authenticator".into(),
        ));
    }
    Ok(reported)
}

/// Verifies an assertion against `credential` and returns the counter to store.
pub(crate) fn verify_authentication(
    response: &AuthenticationResponse,
    expected_challenge: &str,
    credential: &CredentialRecord,
    expected_user_handle: Option<&str>,
    config: &PasskeyConfig,
) -> Result<u32, PasskeyError> {
    let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;
    client_data.verify(TYPE_GET, expected_challenge, &config.origin)?;

    let auth_data = AuthenticatorData::from_base64(&response.response.authenticator_data)?;
    auth_data.verify(&config.rp_id, config.user_verification_required())?;

    // Some authenticators send "" instead of omitting the handle.
    let presented_user_handle = response
        .response
        .user_handle
        .as_deref()
        .filter(|handle| !handle.is_empty());
    if let (Some(expected), Some(presented)) = (expected_user_handle, presented_user_handle) {
        let expected = normalize_handle(expected)?;
        let presented = normalize_handle(presented)?;
        if !bool::from(expected.ct_eq(&presented)) {
            return Err(PasskeyError::Verification("User handle mismatch".into()));
        }
    }

    let signature = decode_base64(&response.response.signature)
        .ok_or_else(|| PasskeyError::Format("Failed to decode signature".into()))?;

    let mut signed_data = auth_data.raw_data.clone();
    signed_data.extend_from_slice(client_data.hash().as_ref());

    let public_key = CredentialPublicKey::from_stored(&credential.public_key)?;
    public_key.verify(&signed_data, &signature)?;

    let counter = next_counter(credential.counter, auth_data.counter, config.counter_policy)?;
    tracing::debug!(
        credential_id = %credential.id,
        stored = credential.counter,
        reported = auth_data.counter,
        "Authentication verified"
    );
    Ok(counter)
}

fn normalize_handle(handle: &str) -> Result<Vec<u8>, PasskeyError> {
    if handle.is_empty() {
        return Err(PasskeyError::Verification("Empty user handle".into()));
    }
    Ok(normalize(&RawIdentifier::Text(handle.to_string()))?.bytes)
}

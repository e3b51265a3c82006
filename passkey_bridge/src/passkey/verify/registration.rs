use chrono::Utc;
use uuid::Uuid;

use crate::passkey::codec::{CanonicalId, normalize};
use crate::passkey::config::PasskeyConfig;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CredentialRecord, RegistrationResponse};

use super::attestation::{AttestationObject, verify_attestation};
use super::auth_data::AuthenticatorData;
use super::client_data::{ParsedClientData, TYPE_CREATE};
use super::cose::CredentialPublicKey;

/// Verifies a registration response against the challenge that was issued for it.
///
/// On success returns the new credential with a zero counter. Persisting it is up to the caller.
pub(crate) fn verify_registration(
    response: &RegistrationResponse,
    expected_challenge: &str,
    config: &PasskeyConfig,
) -> Result<CredentialRecord, PasskeyError> {
    let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;
    client_data.verify(TYPE_CREATE, expected_challenge, &config.origin)?;

    let attestation = AttestationObject::from_base64(&response.response.attestation_object)?;
    let auth_data = AuthenticatorData::from_bytes(attestation.auth_data.clone())?;
    auth_data.verify(&config.rp_id, config.user_verification_required())?;

    let attested = auth_data.attested_credential.as_ref().ok_or_else(|| {
        PasskeyError::AuthenticatorData("Attested credential data flag not set".into())
    })?;

    let credential_id = CanonicalId::from_bytes(attested.credential_id.clone());
    let claimed = normalize(&response.id)?;
    if claimed != credential_id {
        return Err(PasskeyError::Verification(
            "Credential id does not match authenticator data".into(),
        ));
    }
    if let Some(raw_id) = &response.raw_id {
        if normalize(raw_id)? != credential_id {
            return Err(PasskeyError::Verification(
                "rawId does not match authenticator data".into(),
            ));
        }
    }

    let public_key = CredentialPublicKey::from_cose(&attested.public_key)?;
    verify_attestation(&attestation, &public_key, client_data.hash().as_ref())?;

    tracing::debug!(
        credential_id = %credential_id,
        aaguid = %Uuid::from_bytes(attested.aaguid),
        alg = public_key.algorithm(),
        "Registration verified"
    );

    let transports = response
        .response
        .transports
        .clone()
        .filter(|t| !t.is_empty());

    Ok(CredentialRecord {
        id: credential_id,
        public_key: attested.public_key.clone(),
        counter: 0,
        transports,
        created_at: Utc::now(),
    })
}

use crate::utils::base64url_encode;

use super::challenge::ChallengeStore;
use super::config::PasskeyConfig;
use super::errors::PasskeyError;
use super::types::{
    AuthenticationOptions, AuthenticatorSelection, CeremonyType, CredentialRecord,
    PubKeyCredParam, RegistrationOptions, RelyingParty, SUPPORTED_ALGORITHMS, UserEntity,
};

const AUTHENTICATOR_ATTACHMENT: &str = "platform";
const RESIDENT_KEY: &str = "discouraged";
const ATTESTATION: &str = "none";

/// Builds `navigator.credentials.create()` options and issues the registration challenge
/// under `subject_id`.
pub(crate) async fn build_registration_options(
    config: &PasskeyConfig,
    challenges: &ChallengeStore,
    subject_id: &str,
    email: &str,
    exclude: &[CredentialRecord],
) -> Result<RegistrationOptions, PasskeyError> {
    let challenge = challenges
        .issue(subject_id, CeremonyType::Registration)
        .await?;

    Ok(RegistrationOptions {
        challenge,
        rp: RelyingParty {
            name: config.rp_name.clone(),
            id: config.rp_id.clone(),
        },
        user: UserEntity {
            id: base64url_encode(subject_id.as_bytes()),
            name: email.to_string(),
            display_name: email.to_string(),
        },
        pub_key_cred_params: SUPPORTED_ALGORITHMS
            .iter()
            .map(|alg| PubKeyCredParam {
                type_: "public-key".to_string(),
                alg: *alg,
            })
            .collect(),
        timeout: timeout_millis(config),
        attestation: ATTESTATION.to_string(),
        exclude_credentials: exclude.iter().map(CredentialRecord::descriptor).collect(),
        authenticator_selection: AuthenticatorSelection {
            authenticator_attachment: AUTHENTICATOR_ATTACHMENT.to_string(),
            resident_key: RESIDENT_KEY.to_string(),
            require_resident_key: false,
            user_verification: config.user_verification,
        },
    })
}

/// Builds `navigator.credentials.get()` options over every credential the subject holds.
pub(crate) async fn build_authentication_options(
    config: &PasskeyConfig,
    challenges: &ChallengeStore,
    subject_id: &str,
    allow: &[CredentialRecord],
) -> Result<AuthenticationOptions, PasskeyError> {
    let challenge = challenges
        .issue(subject_id, CeremonyType::Authentication)
        .await?;

    Ok(AuthenticationOptions {
        challenge,
        timeout: timeout_millis(config),
        rp_id: config.rp_id.clone(),
        allow_credentials: allow.iter().map(CredentialRecord::descriptor).collect(),
        user_verification: config.user_verification,
    })
}

fn timeout_millis(config: &PasskeyConfig) -> u64 {
    u64::from(config.timeout) * 1000
}

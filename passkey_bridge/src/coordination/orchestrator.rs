use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::idp::TokenProvider;
use crate::passkey::{
    AuthenticationResponse, CeremonyOptions, CeremonyType, ChallengeStore, CredentialRecord,
    ParsedClientData, PasskeyConfig, RawIdentifier, RegistrationResponse, StoredChallenge,
    build_authentication_options, build_registration_options, find_credential, normalize,
    verify_authentication, verify_registration,
};
use crate::userdb::{Subject, SubjectStore, resolve_or_provision};
use crate::utils::base64url_encode;

use super::errors::CoordinationError;
use super::types::{InitResponse, VerifyRequest, VerifyResponse};

/// Runs the two-step passkey flow over injected stores and an identity provider.
///
/// The orchestrator keeps no per-request state. Challenges live in the [`ChallengeStore`],
/// subjects and credentials in the [`SubjectStore`].
pub struct PasskeyOrchestrator {
    config: PasskeyConfig,
    challenges: ChallengeStore,
    subjects: Arc<dyn SubjectStore>,
    tokens: Arc<dyn TokenProvider>,
}

impl PasskeyOrchestrator {
    pub fn new(
        config: PasskeyConfig,
        challenges: ChallengeStore,
        subjects: Arc<dyn SubjectStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            challenges,
            subjects,
            tokens,
        }
    }

    pub fn config(&self) -> &PasskeyConfig {
        &self.config
    }

    /// Starts a ceremony for `email`.
    ///
    /// An unseen email is provisioned as a new subject right away and gets registration
    /// options. A known subject gets authentication options over all of its credentials.
    #[tracing::instrument(skip(self, email))]
    pub async fn initiate(&self, email: &str) -> Result<InitResponse, CoordinationError> {
        let email = normalize_email(email)?;

        let (subject, is_new) = self
            .bounded(
                "subject store",
                resolve_or_provision(self.subjects.as_ref(), &email),
            )
            .await?;

        let (ceremony_type, options) = if is_new {
            let options = self
                .bounded(
                    "challenge store",
                    build_registration_options(
                        &self.config,
                        &self.challenges,
                        &subject.id,
                        &subject.email,
                        &subject.credentials,
                    ),
                )
                .await?;
            (
                CeremonyType::Registration,
                CeremonyOptions::Registration(options),
            )
        } else {
            let options = self
                .bounded(
                    "challenge store",
                    build_authentication_options(
                        &self.config,
                        &self.challenges,
                        &subject.id,
                        &subject.credentials,
                    ),
                )
                .await?;
            (
                CeremonyType::Authentication,
                CeremonyOptions::Authentication(options),
            )
        };

        tracing::info!(subject_id = %subject.id, %ceremony_type, is_new, "Ceremony initiated");
        Ok(InitResponse {
            ceremony_type,
            options,
            user_id: subject.id,
        })
    }

    /// Completes a ceremony started by [`initiate`](Self::initiate).
    ///
    /// The challenge is consumed after the response verifies and before anything is
    /// persisted, so of several concurrent calls for one challenge only one succeeds.
    #[tracing::instrument(skip(self, request), fields(subject_id = %request.user_id, ceremony = %request.ceremony_type))]
    pub async fn verify(&self, request: VerifyRequest) -> Result<VerifyResponse, CoordinationError> {
        let email = normalize_email(&request.email)?;
        let ceremony = request.ceremony_type;

        let stored = self
            .bounded(
                "challenge store",
                self.challenges.fetch(&request.user_id, ceremony),
            )
            .await?
            .ok_or_else(|| CoordinationError::ChallengeExpiredOrMissing.log())?;

        let subject = match ceremony {
            CeremonyType::Registration => {
                let response: RegistrationResponse = parse_response(&request.response)?;
                let subject = self
                    .prepare(&request, &stored, &response.response.client_data_json, &email)
                    .await?;

                let record = verify_registration(&response, &stored.challenge, &self.config)?;
                if subject.credentials.iter().any(|c| c.id == record.id) {
                    return Err(CoordinationError::VerificationFailed(format!(
                        "Credential {} is already registered",
                        record.id
                    ))
                    .log());
                }

                let mut credentials = subject.credentials.clone();
                credentials.push(record);
                self.commit(&subject, &stored, &credentials).await?;
                subject
            }
            CeremonyType::Authentication => {
                let response: AuthenticationResponse = parse_response(&request.response)?;
                let subject = self
                    .prepare(&request, &stored, &response.response.client_data_json, &email)
                    .await?;

                let claimed = normalize(&response.id)?;
                let credential = find_credential(&subject.credentials, &claimed)?;
                let user_handle = base64url_encode(subject.id.as_bytes());
                let counter = verify_authentication(
                    &response,
                    &stored.challenge,
                    credential,
                    Some(&user_handle),
                    &self.config,
                )?;

                let credentials: Vec<CredentialRecord> = subject
                    .credentials
                    .iter()
                    .map(|c| {
                        let mut c = c.clone();
                        if c.id == claimed {
                            c.counter = counter;
                        }
                        c
                    })
                    .collect();
                self.commit(&subject, &stored, &credentials).await?;
                subject
            }
        };

        let tokens = self
            .bounded("identity provider", self.tokens.exchange(&subject.email))
            .await?;

        tracing::info!(subject_id = %subject.id, "Passkey verification succeeded");
        Ok(VerifyResponse {
            success: true,
            tokens,
        })
    }

    /// Checks the presented challenge and loads the subject the ceremony belongs to.
    async fn prepare(
        &self,
        request: &VerifyRequest,
        stored: &StoredChallenge,
        client_data_json: &str,
        email: &str,
    ) -> Result<Subject, CoordinationError> {
        let presented = ParsedClientData::from_base64(client_data_json)?.challenge;
        let valid = self
            .bounded(
                "challenge store",
                self.challenges
                    .validate(&request.user_id, &presented, stored.ceremony_type),
            )
            .await?;
        if !valid {
            // A concurrent verify may have consumed the challenge since it was fetched.
            let outstanding = self
                .bounded(
                    "challenge store",
                    self.challenges
                        .fetch(&request.user_id, stored.ceremony_type),
                )
                .await?
                .is_some();
            return Err(if outstanding {
                CoordinationError::ChallengeMismatch
            } else {
                CoordinationError::ChallengeExpiredOrMissing
            }
            .log());
        }

        let subject = self
            .bounded("subject store", self.subjects.get_by_id(&request.user_id))
            .await?
            .ok_or_else(|| CoordinationError::SubjectNotFound(request.user_id.clone()).log())?;

        // Subjects stored before emails were normalized may carry mixed case.
        if subject.email.to_lowercase() != email {
            return Err(CoordinationError::InputValidation(
                "email does not match the subject".to_string(),
            )
            .log());
        }
        Ok(subject)
    }

    /// Consumes the challenge that was verified against, then persists the credential list.
    async fn commit(
        &self,
        subject: &Subject,
        stored: &StoredChallenge,
        credentials: &[CredentialRecord],
    ) -> Result<(), CoordinationError> {
        let consumed = self
            .bounded(
                "challenge store",
                self.challenges
                    .consume(&subject.id, stored.ceremony_type, &stored.challenge),
            )
            .await?;
        if !consumed {
            tracing::warn!(subject_id = %subject.id, "Challenge was consumed concurrently");
            return Err(CoordinationError::ChallengeExpiredOrMissing.log());
        }

        self.bounded(
            "subject store",
            self.subjects.update_credentials(&subject.id, credentials),
        )
        .await
    }

    /// Runs an external call under the upstream timeout.
    async fn bounded<T, E, F>(&self, what: &str, call: F) -> Result<T, CoordinationError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<CoordinationError>,
    {
        match tokio::time::timeout(self.config.upstream_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(CoordinationError::UpstreamUnavailable(format!(
                "{what} did not answer within {:?}",
                self.config.upstream_timeout
            ))
            .log()),
        }
    }
}

/// Trims and lowercases an email, rejecting values that cannot be an address.
pub(super) fn normalize_email(email: &str) -> Result<String, CoordinationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(CoordinationError::InputValidation(
            "email is required".to_string(),
        ));
    }
    if !email.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(CoordinationError::InputValidation(format!(
            "invalid email: {email}"
        )));
    }
    Ok(email)
}

/// Parses a browser credential, reporting a bad `id` / `rawId` as a malformed identifier.
fn parse_response<T: DeserializeOwned>(response: &Value) -> Result<T, CoordinationError> {
    for field in ["id", "rawId"] {
        if let Some(value) = response.get(field).filter(|v| !v.is_null()) {
            RawIdentifier::try_from(value)?;
        }
    }
    serde_json::from_value(response.clone()).map_err(|e| {
        CoordinationError::InputValidation(format!("Invalid credential response: {e}")).log()
    })
}

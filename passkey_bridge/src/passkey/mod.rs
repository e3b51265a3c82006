//! WebAuthn ceremony support: identifier codec, challenges, options and verification.

mod challenge;
mod codec;
mod config;
mod errors;
mod options;
mod types;
mod verify;

pub use challenge::{ChallengeStore, StoredChallenge};
pub use codec::{CanonicalId, RawIdentifier, normalize, normalize_credential_list, normalize_public_key};
pub use config::{CounterPolicy, PasskeyConfig, UserVerification};
pub use errors::PasskeyError;
pub use types::{
    AuthenticationOptions, CeremonyOptions, CeremonyType, CredentialDescriptor, CredentialRecord,
    RegistrationOptions,
};

pub(crate) use codec::credential_to_value;
pub(crate) use options::{build_authentication_options, build_registration_options};
pub(crate) use types::{AuthenticationResponse, RegistrationResponse};
pub(crate) use verify::{
    ParsedClientData, find_credential, verify_authentication, verify_registration,
};

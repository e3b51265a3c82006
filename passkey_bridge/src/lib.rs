//! # passkey-bridge
//!
//! Passwordless sign-in with passkeys (WebAuthn) that finishes by exchanging the
//! verified identity for tokens issued by an external identity provider.
//!
//! The crate is organised around a single [`PasskeyOrchestrator`] with two operations:
//!
//! - [`PasskeyOrchestrator::initiate`] decides between registration and authentication
//!   for an email address, issues a one-time challenge and returns the options the
//!   browser passes to `navigator.credentials.create()` / `get()`.
//! - [`PasskeyOrchestrator::verify`] checks the authenticator's signed response against
//!   the issued challenge, persists the credential state and returns a token bundle.
//!
//! Every collaborator is injected: a [`ChallengeStore`] over any [`CacheStore`], a
//! [`SubjectStore`] for users and their credentials, and a [`TokenProvider`] for the
//! identity provider.
//!
//! ```no_run
//! use std::sync::Arc;
//! use passkey_bridge::{
//!     ChallengeStore, InMemoryCacheStore, InMemorySubjectStore, KeycloakConfig,
//!     KeycloakTokenProvider, PasskeyConfig, PasskeyOrchestrator,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PasskeyConfig::from_env()?;
//! let challenges = ChallengeStore::new(Arc::new(InMemoryCacheStore::new()), config.challenge_ttl);
//! let tokens = KeycloakTokenProvider::new(KeycloakConfig::from_env()?)?;
//! let orchestrator = PasskeyOrchestrator::new(
//!     config,
//!     challenges,
//!     Arc::new(InMemorySubjectStore::new()),
//!     Arc::new(tokens),
//! );
//! let init = orchestrator.initiate("alice@example.com").await?;
//! println!("{}", init.ceremony_type);
//! # Ok(())
//! # }
//! ```

mod config;
mod coordination;
mod idp;
mod passkey;
mod storage;
mod userdb;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::ConfigError;

pub use coordination::{
    CoordinationError, InitRequest, InitResponse, PasskeyOrchestrator, VerifyRequest,
    VerifyResponse,
};

pub use idp::{IdpError, KeycloakConfig, KeycloakTokenProvider, TokenBundle, TokenProvider};

pub use passkey::{
    AuthenticationOptions, CanonicalId, CeremonyOptions, CeremonyType, ChallengeStore,
    CounterPolicy, CredentialDescriptor, CredentialRecord, PasskeyConfig, PasskeyError,
    RawIdentifier, RegistrationOptions, StoredChallenge, UserVerification, normalize,
    normalize_credential_list, normalize_public_key,
};

pub use storage::{
    CacheData, CacheStore, CacheStoreKind, InMemoryCacheStore, RedisCacheStore, StorageError,
    cache_store_from_env,
};

pub use userdb::{
    DataStoreKind, InMemorySubjectStore, SqlxSubjectStore, Subject, SubjectStore, UserError,
    resolve_or_provision, subject_store_from_env,
};

pub use utils::{UtilError, gen_random_string};

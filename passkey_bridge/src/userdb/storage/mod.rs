mod config;
mod memory;
mod postgres;
mod sqlite;
mod store_type;

use async_trait::async_trait;
use uuid::Uuid;

use crate::passkey::CredentialRecord;

use super::errors::UserError;
use super::types::Subject;

pub use config::{DataStoreKind, subject_store_from_env};
pub use memory::InMemorySubjectStore;
pub use store_type::SqlxSubjectStore;

/// Durable storage of subjects and their credentials.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    async fn init(&self) -> Result<(), UserError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Subject>, UserError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<Subject>, UserError>;

    /// Stores `subject` unless a subject with the same email already exists, and returns
    /// the subject that owns the email afterwards.
    async fn create(&self, subject: Subject) -> Result<Subject, UserError>;

    /// Replaces the full credential list of subject `id`.
    async fn update_credentials(
        &self,
        id: &str,
        credentials: &[CredentialRecord],
    ) -> Result<(), UserError>;
}

/// Looks up the subject for `email`, creating one with a fresh id if none exists.
///
/// This writes to the store: an unseen email leaves a subject behind even if the
/// registration that follows is never completed. The flag is `true` when the
/// returned subject was created by this call.
#[tracing::instrument(skip(store))]
pub async fn resolve_or_provision(
    store: &dyn SubjectStore,
    email: &str,
) -> Result<(Subject, bool), UserError> {
    if let Some(subject) = store.get_by_email(email).await? {
        return Ok((subject, false));
    }

    let id = Uuid::new_v4().to_string();
    let subject = store
        .create(Subject::new(id.clone(), email.to_string()))
        .await?;
    let is_new = subject.id == id;
    tracing::info!(subject_id = %subject.id, is_new, "Subject provisioned");
    Ok((subject, is_new))
}

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::passkey::CredentialRecord;
use crate::userdb::{errors::UserError, types::Subject};

use super::SubjectStore;

/// Subject store kept in process memory, keyed by subject id.
#[derive(Debug, Default)]
pub struct InMemorySubjectStore {
    subjects: Mutex<HashMap<String, Subject>>,
}

impl InMemorySubjectStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory subject store");
        Self::default()
    }
}

#[async_trait]
impl SubjectStore for InMemorySubjectStore {
    async fn init(&self) -> Result<(), UserError> {
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Subject>, UserError> {
        Ok(self.subjects.lock().await.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subject>, UserError> {
        Ok(self
            .subjects
            .lock()
            .await
            .values()
            .filter(|s| s.email.eq_ignore_ascii_case(email))
            .min_by_key(|s| s.created_at)
            .cloned())
    }

    async fn create(&self, subject: Subject) -> Result<Subject, UserError> {
        let mut subjects = self.subjects.lock().await;
        if let Some(existing) = subjects
            .values()
            .find(|s| s.email.eq_ignore_ascii_case(&subject.email))
        {
            return Ok(existing.clone());
        }
        subjects.insert(subject.id.clone(), subject.clone());
        Ok(subject)
    }

    async fn update_credentials(
        &self,
        id: &str,
        credentials: &[CredentialRecord],
    ) -> Result<(), UserError> {
        let mut subjects = self.subjects.lock().await;
        let subject = subjects.get_mut(id).ok_or(UserError::NotFound)?;
        subject.credentials = credentials.to_vec();
        subject.updated_at = Utc::now();
        Ok(())
    }
}

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Sqlite};

use crate::passkey::CredentialRecord;
use crate::userdb::{errors::UserError, types::Subject, types::credentials_to_json};

use super::SubjectStore;
use super::postgres::*;
use super::sqlite::*;

/// Subject store over a SQLite or Postgres pool.
#[derive(Clone, Debug)]
pub enum SqlxSubjectStore {
    Sqlite { pool: Pool<Sqlite>, table: String },
    Postgres { pool: Pool<Postgres>, table: String },
}

impl SqlxSubjectStore {
    pub fn sqlite(pool: Pool<Sqlite>, table_prefix: &str) -> Self {
        Self::Sqlite {
            pool,
            table: format!("{table_prefix}subjects"),
        }
    }

    pub fn postgres(pool: Pool<Postgres>, table_prefix: &str) -> Self {
        Self::Postgres {
            pool,
            table: format!("{table_prefix}subjects"),
        }
    }

    pub fn table_name(&self) -> &str {
        match self {
            Self::Sqlite { table, .. } | Self::Postgres { table, .. } => table,
        }
    }
}

#[async_trait]
impl SubjectStore for SqlxSubjectStore {
    async fn init(&self) -> Result<(), UserError> {
        match self {
            Self::Sqlite { pool, table } => create_tables_sqlite(pool, table).await,
            Self::Postgres { pool, table } => create_tables_postgres(pool, table).await,
        }
    }

    #[tracing::instrument(skip(self), fields(table = %self.table_name()))]
    async fn get_by_id(&self, id: &str) -> Result<Option<Subject>, UserError> {
        let result = match self {
            Self::Sqlite { pool, table } => get_subject_by_id_sqlite(pool, table, id).await,
            Self::Postgres { pool, table } => get_subject_by_id_postgres(pool, table, id).await,
        };

        match &result {
            Ok(found) => tracing::debug!(found = found.is_some(), "Subject lookup completed"),
            Err(e) => tracing::error!(error = %e, "Subject lookup failed"),
        }
        result
    }

    #[tracing::instrument(skip(self), fields(table = %self.table_name()))]
    async fn get_by_email(&self, email: &str) -> Result<Option<Subject>, UserError> {
        let result = match self {
            Self::Sqlite { pool, table } => get_subject_by_email_sqlite(pool, table, email).await,
            Self::Postgres { pool, table } => {
                get_subject_by_email_postgres(pool, table, email).await
            }
        };

        match &result {
            Ok(found) => tracing::debug!(found = found.is_some(), "Subject lookup completed"),
            Err(e) => tracing::error!(error = %e, "Subject lookup failed"),
        }
        result
    }

    #[tracing::instrument(skip(self, subject), fields(subject_id = %subject.id))]
    async fn create(&self, subject: Subject) -> Result<Subject, UserError> {
        let result = match self {
            Self::Sqlite { pool, table } => create_subject_sqlite(pool, table, subject).await,
            Self::Postgres { pool, table } => create_subject_postgres(pool, table, subject).await,
        };

        match &result {
            Ok(stored) => tracing::info!(stored_id = %stored.id, "Subject create completed"),
            Err(e) => tracing::error!(error = %e, "Subject create failed"),
        }
        result
    }

    #[tracing::instrument(skip(self, credentials), fields(count = credentials.len()))]
    async fn update_credentials(
        &self,
        id: &str,
        credentials: &[CredentialRecord],
    ) -> Result<(), UserError> {
        let json = credentials_to_json(credentials)?;
        match self {
            Self::Sqlite { pool, table } => update_credentials_sqlite(pool, table, id, &json).await,
            Self::Postgres { pool, table } => {
                update_credentials_postgres(pool, table, id, &json).await
            }
        }
    }
}

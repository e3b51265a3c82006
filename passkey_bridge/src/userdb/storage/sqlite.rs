use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::userdb::errors::UserError;
use crate::userdb::types::{Subject, SubjectRow, credentials_to_json};

pub(super) async fn create_tables_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
) -> Result<(), UserError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            credentials TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn get_subject_by_id_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
) -> Result<Option<Subject>, UserError> {
    let row = sqlx::query_as::<_, SubjectRow>(&format!(
        r#"
        SELECT id, email, credentials, created_at, updated_at FROM {table_name} WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(SubjectRow::into_subject))
}

pub(super) async fn get_subject_by_email_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    email: &str,
) -> Result<Option<Subject>, UserError> {
    let row = sqlx::query_as::<_, SubjectRow>(&format!(
        r#"
        SELECT id, email, credentials, created_at, updated_at FROM {table_name}
        WHERE LOWER(email) = LOWER(?)
        ORDER BY created_at
        LIMIT 1
        "#
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(SubjectRow::into_subject))
}

/// Inserts `subject` unless its email is taken, then returns whichever row owns the email.
pub(super) async fn create_subject_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    subject: Subject,
) -> Result<Subject, UserError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (id, email, credentials, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (email) DO NOTHING
        "#
    ))
    .bind(&subject.id)
    .bind(&subject.email)
    .bind(credentials_to_json(&subject.credentials)?)
    .bind(subject.created_at)
    .bind(subject.updated_at)
    .execute(pool)
    .await?;

    get_subject_by_email_sqlite(pool, table_name, &subject.email)
        .await?
        .ok_or(UserError::NotFound)
}

pub(super) async fn update_credentials_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    credentials: &str,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET credentials = ?, updated_at = ? WHERE id = ?
        "#
    ))
    .bind(credentials)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }
    Ok(())
}

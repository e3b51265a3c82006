//! Subject store selection from the environment

use std::{fmt, str::FromStr, sync::Arc};

use sqlx::{postgres::PgPoolOptions, sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions};

use crate::config::{env_or, env_parse};
use crate::userdb::errors::UserError;

use super::{SqlxSubjectStore, SubjectStore};

const DEFAULT_DATA_STORE_URL: &str = "sqlite:passkey_bridge.db";
const DEFAULT_TABLE_PREFIX: &str = "pb_";

/// Which database holds the subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStoreKind {
    Sqlite,
    Postgres,
}

impl FromStr for DataStoreKind {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" => Ok(Self::Postgres),
            other => Err(UserError::Storage(format!(
                "Unsupported store type: {other}. Supported types are 'sqlite' and 'postgres'"
            ))),
        }
    }
}

impl fmt::Display for DataStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

impl SqlxSubjectStore {
    /// Connects to `url` and prepares the subjects table.
    pub async fn connect(
        kind: DataStoreKind,
        url: &str,
        table_prefix: &str,
    ) -> Result<Self, UserError> {
        let store = match kind {
            DataStoreKind::Sqlite => {
                let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
                // Every connection to an in-memory database would see its own empty copy.
                let max_connections = if url.contains(":memory:") { 1 } else { 5 };
                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect_with(opts)
                    .await?;
                Self::sqlite(pool, table_prefix)
            }
            DataStoreKind::Postgres => {
                let pool = PgPoolOptions::new().connect(url).await?;
                Self::postgres(pool, table_prefix)
            }
        };

        store.init().await?;
        Ok(store)
    }
}

/// Builds the subject store named by `GENERIC_DATA_STORE_TYPE` (`sqlite` by default)
/// at `GENERIC_DATA_STORE_URL`, with tables prefixed by `DB_TABLE_PREFIX`.
pub async fn subject_store_from_env() -> Result<Arc<dyn SubjectStore>, UserError> {
    let kind = env_parse(&["GENERIC_DATA_STORE_TYPE"], DataStoreKind::Sqlite);
    let url = env_or(&["GENERIC_DATA_STORE_URL"], DEFAULT_DATA_STORE_URL);
    let prefix = env_or(&["DB_TABLE_PREFIX"], DEFAULT_TABLE_PREFIX);

    tracing::info!("Initializing data store with type: {}, url: {}", kind, url);
    let store = SqlxSubjectStore::connect(kind, &url, &prefix).await?;
    tracing::info!(table = store.table_name(), "Subject store ready");
    Ok(Arc::new(store))
}

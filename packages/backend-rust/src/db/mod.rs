pub mod config;
pub mod operations;
pub mod sqlite_schema;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError, DbMode, SqliteConfig};
use crate::db::sqlite_schema::{split_sql_statements, SCHEMA_SQL, SCHEMA_VERSION};
use crate::store::Stores;

/// SQLite-backed implementation of every storage collaborator.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DbInitError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DbInitError::Io(e.to_string()))?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", config.path.display());
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| DbInitError::Config(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(DbInitError::Sqlx)?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::info!(path = %config.path.display(), "sqlite store ready");
        Ok(store)
    }

    /// Wraps an existing pool; the schema is applied if missing.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DbInitError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), DbInitError> {
        let version: Option<String> =
            sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
                .fetch_optional(&self.pool)
                .await
                .unwrap_or(None);

        if version.as_deref() == Some(SCHEMA_VERSION) {
            return Ok(());
        }

        for stmt in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&stmt)
                .execute(&self.pool)
                .await
                .map_err(DbInitError::Sqlx)?;
        }

        sqlx::query(
            r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
        )
        .bind(SCHEMA_VERSION)
        .execute(&self.pool)
        .await
        .map_err(DbInitError::Sqlx)?;

        tracing::debug!(version = SCHEMA_VERSION, "sqlite schema applied");
        Ok(())
    }
}

/// Builds the storage collaborators selected by `DB_MODE`.
pub async fn init_stores(config: &DbConfig) -> Result<Stores, DbInitError> {
    match config.mode {
        DbMode::Memory => {
            tracing::warn!("DB_MODE=memory: progress is lost on restart");
            Ok(Stores::in_memory().0)
        }
        DbMode::Sqlite => {
            let store = SqliteStore::connect(&config.sqlite).await?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Env(#[from] DbConfigError),
}

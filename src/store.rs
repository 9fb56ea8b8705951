// src/store.rs

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::errors::AppResult;

/// Handle to the FinserveNew SQLite store.
///
/// The pool is pinned to a single connection: PRAGMA state (notably
/// `foreign_keys`, which the migration runner toggles around table rebuilds)
/// is connection-scoped, and an in-memory database only exists on the
/// connection that opened it.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) a file-backed store.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        Self::with_options(connect_opts).await
    }

    /// Open a fresh in-memory store. Used by tests and `schema verify --scratch`.
    pub async fn connect_memory() -> AppResult<Self> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        Self::with_options(connect_opts).await
    }

    async fn with_options(connect_opts: SqliteConnectOptions) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

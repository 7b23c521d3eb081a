pub mod corpus;
pub mod reviews;
pub mod schema;
pub mod student;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::EngineConfig;

/// Pooled connection scoped to one logical operation. Returned to the pool on drop.
pub type Session = PoolConnection<Sqlite>;

/// Handle to one student's review database with the course corpus alongside.
#[derive(Clone)]
pub struct ReviewDb {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl ReviewDb {
    pub async fn open(config: &EngineConfig) -> Result<Self, DbInitError> {
        Self::open_path(&config.database_path, config.max_connections, config.busy_timeout).await
    }

    pub async fn open_path(
        path: &Path,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self, DbInitError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DbInitError::Io(e.to_string()))?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| DbInitError::Config(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        schema::migrate(&pool).await?;
        student::ensure_student(&pool).await?;

        tracing::debug!(path = %path.display(), "review database opened");

        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquires an independent connection for the caller's exclusive use.
    pub async fn session(&self) -> Result<Session, StoreError> {
        Ok(self.pool.acquire().await?)
    }

    /// Starts a write transaction. Writers are serialized through the store's
    /// write lock so read-modify-write sequences never interleave.
    pub async fn begin_write(&self) -> Result<WriteTx, StoreError> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(WriteTx { tx, _guard: guard })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Write transaction holding the store's write lock. Dropping it without
/// `commit` rolls back, then releases the lock.
pub struct WriteTx {
    // Field order matters: the transaction must roll back before the lock is released.
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

impl WriteTx {
    pub fn conn(&mut self) -> &mut sqlx::SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("malformed row: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("student profile missing")]
    MissingStudent,
}

//! Connection pool lifecycle.
//!
//! The pool is owned by a `PoolManager` that the process entry point constructs and
//! hands to every consumer. It is created eagerly by `init`, or lazily by the first
//! `acquire` when startup creation failed or the pool was lost, and closed by `shutdown`.

use crate::config::PoolConfig;
use crate::error::AuthError;
use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub type SqlitePool = Pool<Sqlite>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum PoolState {
    Uninitialized,
    Ready(SqlitePool),
    ShutDown,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PoolStatus {
    pub state: &'static str,
    pub min_size: u32,
    pub max_size: u32,
    pub live_connections: u32,
    pub idle_connections: usize,
}

pub struct PoolManager {
    connect_options: SqliteConnectOptions,
    settings: PoolConfig,
    state: RwLock<PoolState>,
}

impl PoolManager {
    /// Parse the connection string. No connection is opened until `init` or `acquire`.
    pub fn new(database_url: &str, settings: PoolConfig) -> Result<Self, AuthError> {
        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AuthError::PoolUnavailable(format!("invalid database url: {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);
        Ok(Self::with_options(connect_options, settings))
    }

    pub fn with_options(connect_options: SqliteConnectOptions, settings: PoolConfig) -> Self {
        Self {
            connect_options,
            settings,
            state: RwLock::new(PoolState::Uninitialized),
        }
    }

    /// Create the pool now. Also re-opens a manager that was shut down.
    pub async fn init(&self) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        if let PoolState::Ready(pool) = &*state
            && !pool.is_closed()
        {
            return Ok(());
        }
        let pool = self.create().await?;
        *state = PoolState::Ready(pool);
        Ok(())
    }

    /// Check out a connection, waiting at most the configured acquire timeout.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, AuthError> {
        let pool = self.current_or_create().await?;
        pool.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => {
                warn!(
                    max_size = self.settings.max_connections,
                    "timed out waiting for a free database connection"
                );
                AuthError::PoolUnavailable("timed out waiting for a connection".to_string())
            }
            sqlx::Error::PoolClosed => {
                AuthError::PoolUnavailable("connection pool is closed".to_string())
            }
            other => AuthError::PoolUnavailable(other.to_string()),
        })
    }

    /// Hand a connection back. The pool keeps it open for reuse.
    pub fn release(&self, conn: PoolConnection<Sqlite>) {
        drop(conn);
    }

    /// Close every connection. `acquire` fails until the next `init`.
    pub async fn shutdown(&self) {
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, PoolState::ShutDown)
        };
        if let PoolState::Ready(pool) = previous {
            pool.close().await;
            info!("connection pool closed");
        }
    }

    pub async fn status(&self) -> PoolStatus {
        let state = self.state.read().await;
        let (label, live, idle) = match &*state {
            PoolState::Uninitialized => ("uninitialized", 0, 0),
            PoolState::Ready(pool) if pool.is_closed() => ("lost", 0, 0),
            PoolState::Ready(pool) => ("ready", pool.size(), pool.num_idle()),
            PoolState::ShutDown => ("shut_down", 0, 0),
        };
        PoolStatus {
            state: label,
            min_size: self.settings.min_connections,
            max_size: self.settings.max_connections,
            live_connections: live,
            idle_connections: idle,
        }
    }

    /// The live pool, if one exists.
    pub async fn pool(&self) -> Option<SqlitePool> {
        match &*self.state.read().await {
            PoolState::Ready(pool) => Some(pool.clone()),
            _ => None,
        }
    }

    async fn current_or_create(&self) -> Result<SqlitePool, AuthError> {
        {
            let state = self.state.read().await;
            match &*state {
                PoolState::Ready(pool) if !pool.is_closed() => return Ok(pool.clone()),
                PoolState::ShutDown => return Err(shut_down()),
                _ => {}
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have rebuilt it while we waited for the write lock.
        match &*state {
            PoolState::Ready(pool) if !pool.is_closed() => return Ok(pool.clone()),
            PoolState::ShutDown => return Err(shut_down()),
            PoolState::Ready(_) => warn!("connection pool was lost; recreating"),
            PoolState::Uninitialized => debug!("connection pool not created yet; creating lazily"),
        }
        let pool = self.create().await?;
        *state = PoolState::Ready(pool.clone());
        Ok(pool)
    }

    async fn create(&self) -> Result<SqlitePool, AuthError> {
        let pool = SqlitePoolOptions::new()
            .min_connections(self.settings.min_connections)
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout())
            .connect_with(self.connect_options.clone())
            .await
            .map_err(|e| {
                error!(error = %e, "failed to create connection pool");
                AuthError::PoolUnavailable(e.to_string())
            })?;
        info!(
            min_size = self.settings.min_connections,
            max_size = self.settings.max_connections,
            "connection pool created"
        );
        Ok(pool)
    }
}

fn shut_down() -> AuthError {
    AuthError::PoolUnavailable("connection pool has been shut down".to_string())
}

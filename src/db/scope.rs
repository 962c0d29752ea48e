use crate::db::pool::PoolManager;
use crate::error::AuthError;
use futures::future::BoxFuture;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Sqlite, SqliteConnection};
use tracing::{error, warn};

/// One unit of work on one pooled connection.
///
/// `run` commits when the body returns `Ok` and rolls back when it returns `Err`,
/// handing the body's error back untouched. The connection goes back to the pool on
/// every path; if the body panics, dropping the open transaction rolls it back and
/// dropping the connection returns it.
///
/// Read scopes open with a deferred `BEGIN`. Write scopes open with `BEGIN IMMEDIATE`
/// and hold the write lock from the start: under WAL a deferred transaction that reads
/// and then writes fails with `SQLITE_BUSY_SNAPSHOT` once another writer commits.
pub struct TransactionScope<'p> {
    pool: &'p PoolManager,
    mode: ScopeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Read,
    Write,
}

impl ScopeMode {
    fn begin_statement(self) -> &'static str {
        match self {
            ScopeMode::Read => "BEGIN",
            ScopeMode::Write => "BEGIN IMMEDIATE",
        }
    }
}

impl<'p> TransactionScope<'p> {
    pub fn new(pool: &'p PoolManager) -> Self {
        Self::with_mode(pool, ScopeMode::Read)
    }

    pub fn with_mode(pool: &'p PoolManager, mode: ScopeMode) -> Self {
        Self { pool, mode }
    }

    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    /// Run `body` inside a transaction.
    ///
    /// The body receives the transaction's connection and must only capture owned data:
    ///
    /// ```ignore
    /// let name = username.to_owned();
    /// let found = TransactionScope::new(&pool)
    ///     .run(move |conn| Box::pin(async move {
    ///         AuthRepository::find_active_by_username(conn, &name).await
    ///     }))
    ///     .await?;
    /// ```
    pub fn run<T, F>(self, body: F) -> BoxFuture<'p, Result<T, AuthError>>
    where
        T: Send + 'p,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, AuthError>>
            + Send
            + 'p,
    {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await?;
            let outcome = Self::run_on(&mut conn, self.mode, body).await;
            self.pool.release(conn);
            outcome
        })
    }

    async fn run_on<T, F>(
        conn: &mut PoolConnection<Sqlite>,
        mode: ScopeMode,
        body: F,
    ) -> Result<T, AuthError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, AuthError>>,
    {
        let mut tx = conn.begin_with(mode.begin_statement()).await?;
        match body(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "rolling back transaction");
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl PoolManager {
    /// Scope for units of work that only read.
    pub fn scope(&self) -> TransactionScope<'_> {
        TransactionScope::new(self)
    }

    /// Scope for units of work that write, serialized against other writers.
    pub fn write_scope(&self) -> TransactionScope<'_> {
        TransactionScope::with_mode(self, ScopeMode::Write)
    }
}

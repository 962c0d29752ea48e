use crate::db::models::{ClientInfo, LoginAttempt};
use crate::db::pool::PoolManager;
use crate::db::repository::AuthRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

/// Writes one `login_audit` row per authentication attempt.
///
/// Each record commits in its own transaction so rejected logins stay on file. A failed
/// write is logged and dropped; it never changes the login outcome.
#[derive(Clone)]
pub struct AuditRecorder {
    pool: Arc<PoolManager>,
}

impl AuditRecorder {
    pub fn new(pool: Arc<PoolManager>) -> Self {
        Self { pool }
    }

    pub async fn record(&self, username: &str, client: &ClientInfo, succeeded: bool) {
        let attempt = LoginAttempt {
            username: username.to_string(),
            client: client.clone(),
            succeeded,
            occurred_at: Utc::now(),
        };
        let result = self
            .pool
            .write_scope()
            .run(move |conn| {
                Box::pin(async move { AuthRepository::insert_audit(conn, &attempt).await })
            })
            .await;

        if let Err(e) = result {
            error!(
                username,
                succeeded,
                client_ip = client.ip.as_deref().unwrap_or("<unknown>"),
                error = %e,
                "failed to write login audit record"
            );
        }
    }
}

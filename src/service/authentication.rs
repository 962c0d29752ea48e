use crate::db::models::{AuthenticatedSubject, ClientInfo, Identifier};
use crate::db::pool::PoolManager;
use crate::db::repository::AuthRepository;
use crate::error::AuthError;
use crate::service::audit::AuditRecorder;
use crate::service::credential_verifier::CredentialVerifier;
use std::sync::Arc;
use std::time::Instant;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

const MAX_FIELD_LEN: usize = 100;

/// Progress of a single login, logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Received,
    LookedUp,
    Verified,
    Rejected,
    Audited,
    Done,
}

/// Login, self-service password change and administrative bulk reset.
#[derive(Clone)]
pub struct AuthenticationService {
    pool: Arc<PoolManager>,
    verifier: CredentialVerifier,
    audit: AuditRecorder,
    admin_key: Arc<str>,
}

impl AuthenticationService {
    pub fn new(
        pool: Arc<PoolManager>,
        verifier: CredentialVerifier,
        admin_key: impl Into<Arc<str>>,
    ) -> Self {
        let audit = AuditRecorder::new(pool.clone());
        Self {
            pool,
            verifier,
            audit,
            admin_key: admin_key.into(),
        }
    }

    pub fn pool(&self) -> &Arc<PoolManager> {
        &self.pool
    }

    /// Authenticate and return identity plus roles.
    ///
    /// Every call leaves exactly one audit row whose `succeeded` matches the result.
    /// Unknown users, deleted or suspended accounts and wrong passwords all yield
    /// `InvalidCredentials`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<AuthenticatedSubject, AuthError> {
        let started = Instant::now();
        debug!(username, stage = ?LoginStage::Received);

        let outcome = self.check(username, password).await;
        let succeeded = outcome.is_ok();

        self.audit.record(username, client, succeeded).await;
        debug!(username, stage = ?LoginStage::Audited);

        info!(
            username,
            succeeded,
            duration_ms = started.elapsed().as_millis() as u64,
            "login attempt"
        );
        debug!(username, stage = ?LoginStage::Done);
        outcome
    }

    async fn check(&self, username: &str, password: &str) -> Result<AuthenticatedSubject, AuthError> {
        validate_field("username", username)?;
        validate_field("password", password)?;

        let lookup = username.to_string();
        let credential = self
            .pool
            .scope()
            .run(move |conn| {
                Box::pin(async move { AuthRepository::find_active_by_username(conn, &lookup).await })
            })
            .await?;
        if credential.is_some() {
            debug!(username, stage = ?LoginStage::LookedUp);
        }

        let digest = credential.as_ref().map(|c| c.password_hash.clone());
        let matched = self
            .verifier
            .verify_blocking(password.to_string(), digest)
            .await?;

        let credential = match credential {
            Some(c) if matched && !c.is_suspended => c,
            _ => {
                debug!(username, stage = ?LoginStage::Rejected);
                return Err(AuthError::InvalidCredentials);
            }
        };
        debug!(username, stage = ?LoginStage::Verified);

        let subject_id = credential.subject_id;
        let roles = self
            .pool
            .scope()
            .run(move |conn| {
                Box::pin(async move { AuthRepository::roles_for_subject(conn, subject_id).await })
            })
            .await?;

        Ok(AuthenticatedSubject::new(credential, roles))
    }

    /// Replace one credential's password. `identifier` is an email or a username.
    /// Returns the subject id. Concurrent updates of the same account: last commit wins.
    pub async fn update_password(
        &self,
        identifier: &str,
        new_password: &str,
    ) -> Result<i64, AuthError> {
        let identifier = Identifier::parse(identifier)
            .ok_or_else(|| AuthError::InvalidRequest("identifier must not be empty".to_string()))?;
        validate_field("new_password", new_password)?;

        let digest = self.verifier.hash_blocking(new_password.to_string()).await?;

        let subject_id = self
            .pool
            .write_scope()
            .run(move |conn| {
                Box::pin(async move {
                    let credential = AuthRepository::find_active(conn, &identifier)
                        .await?
                        .ok_or_else(|| AuthError::NotFound(identifier.to_string()))?;
                    AuthRepository::update_password_hash(conn, credential.subject_id, &digest)
                        .await?;
                    Ok::<_, AuthError>(credential.subject_id)
                })
            })
            .await?;

        info!(subject_id, "password updated");
        Ok(subject_id)
    }

    /// Set every active credential to `new_password` in one transaction.
    /// Returns the number of credentials updated; on any failure none are.
    pub async fn bulk_reset_passwords(
        &self,
        admin_key: &str,
        new_password: &str,
    ) -> Result<u64, AuthError> {
        if !self.admin_key_matches(admin_key) {
            warn!("bulk password reset rejected: invalid administrative key");
            return Err(AuthError::Unauthorized);
        }
        validate_field("new_password", new_password)?;

        let digest = self.verifier.hash_blocking(new_password.to_string()).await?;

        let count = self
            .pool
            .write_scope()
            .run(move |conn| {
                Box::pin(async move { AuthRepository::update_all_active_hashes(conn, &digest).await })
            })
            .await?;

        info!(count, "bulk password reset committed");
        Ok(count)
    }

    fn admin_key_matches(&self, candidate: &str) -> bool {
        // An unset key disables bulk resets entirely.
        if self.admin_key.is_empty() {
            return false;
        }
        bool::from(candidate.as_bytes().ct_eq(self.admin_key.as_bytes()))
    }
}

fn validate_field(name: &str, value: &str) -> Result<(), AuthError> {
    let len = value.chars().count();
    if len == 0 || len > MAX_FIELD_LEN {
        return Err(AuthError::InvalidRequest(format!(
            "{name} must be between 1 and {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_field_bounds() {
        assert!(validate_field("username", "frank").is_ok());
        assert!(validate_field("username", "").is_err());
        assert!(validate_field("password", &"x".repeat(MAX_FIELD_LEN)).is_ok());
        assert!(validate_field("password", &"x".repeat(MAX_FIELD_LEN + 1)).is_err());
    }
}

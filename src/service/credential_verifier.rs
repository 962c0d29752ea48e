//! Password hashing with Argon2id.

use crate::config::HashingConfig;
use crate::error::AuthError;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

/// Minimum accepted cost: the Argon2id defaults (19 MiB, 2 passes, 1 lane).
pub const MIN_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
pub const MIN_ITERATIONS: u32 = Params::DEFAULT_T_COST;
pub const MIN_PARALLELISM: u32 = Params::DEFAULT_P_COST;

#[derive(Clone)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
    /// Burned on unknown usernames so they cost as much as a wrong password.
    decoy_hash: Arc<str>,
}

impl CredentialVerifier {
    pub fn new(cfg: &HashingConfig) -> Result<Self, AuthError> {
        if cfg.memory_kib < MIN_MEMORY_KIB
            || cfg.iterations < MIN_ITERATIONS
            || cfg.parallelism < MIN_PARALLELISM
        {
            return Err(AuthError::Internal(format!(
                "argon2 cost m={} KiB t={} p={} is below the floor m={MIN_MEMORY_KIB} t={MIN_ITERATIONS} p={MIN_PARALLELISM}",
                cfg.memory_kib, cfg.iterations, cfg.parallelism
            )));
        }
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| AuthError::Internal(format!("invalid argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut verifier = Self {
            argon2,
            decoy_hash: Arc::from(""),
        };
        verifier.decoy_hash = Arc::from(verifier.hash("decoy-password-never-matches")?);
        Ok(verifier)
    }

    /// Hash `plaintext` with a fresh random salt into a PHC string.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("password hash error: {e}")))?;
        Ok(hash.to_string())
    }

    /// False on mismatch and on empty or malformed digests.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend one verification's worth of work against the decoy hash.
    pub fn verify_decoy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.decoy_hash);
    }

    /// `hash` on the blocking thread pool.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, AuthError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
    }

    /// `verify` on the blocking thread pool. `None` runs the decoy check and yields false.
    pub async fn verify_blocking(
        &self,
        plaintext: String,
        digest: Option<String>,
    ) -> Result<bool, AuthError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || match digest {
            Some(digest) => this.verify(&plaintext, &digest),
            None => {
                this.verify_decoy(&plaintext);
                false
            }
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))
    }
}

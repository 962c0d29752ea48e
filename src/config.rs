use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process configuration, resolved once at startup and passed to constructors.
///
/// Sources, later ones win:
/// - built-in defaults
/// - `DATABASE_URL`
/// - `CAMPUS_*` variables, nested with `__` (e.g. `CAMPUS_POOL__MAX_CONNECTIONS=20`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    /// Secret guarding bulk password resets. Empty means every reset is rejected.
    pub admin_key: String,
    /// Take the client IP from `x-real-ip`/`x-forwarded-for`. Enable only behind a
    /// reverse proxy that overwrites them; otherwise the peer address is recorded.
    pub trust_proxy_headers: bool,
    pub pool: PoolConfig,
    pub hashing: HashingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://campus_virtual.sqlite".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            admin_key: String::new(),
            trust_proxy_headers: false,
            pool: PoolConfig::default(),
            hashing: HashingConfig::default(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Config {
    /// Load from the environment on top of defaults and validate the result.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract::<Self>()?.validated()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(&["DATABASE_URL"]))
            .merge(Env::prefixed("CAMPUS_").split("__"))
    }

    fn validated(self) -> Result<Self, figment::Error> {
        let pool = &self.pool;
        if pool.max_connections == 0 {
            return Err("pool.max_connections must be at least 1".to_string().into());
        }
        if pool.min_connections > pool.max_connections {
            return Err(format!(
                "pool.min_connections ({}) exceeds pool.max_connections ({})",
                pool.min_connections, pool.max_connections
            )
            .into());
        }
        if pool.acquire_timeout_secs == 0 {
            return Err("pool.acquire_timeout_secs must be positive".to_string().into());
        }
        Ok(self)
    }
}

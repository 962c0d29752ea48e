//! Database module: pooled connections, transaction scopes and the auth repository.
//!
//! Layout:
//! - `pool.rs`: `PoolManager`, the injected connection-pool owner
//! - `scope.rs`: `TransactionScope`, commit/rollback/release around one unit of work
//! - `models.rs`: typed rows decoded at the repository boundary
//! - `repository.rs`: raw SQL against the campus schema
//!
//! The schema itself (`mdl_user`, `mdl_role`, `mdl_role_assignments`, `login_audit`)
//! is owned by the campus database and never created here.

pub mod models;
pub mod pool;
pub mod repository;
pub mod scope;

pub use models::{AuthenticatedSubject, ClientInfo, Credential, RoleAssignment};
pub use pool::{PoolManager, PoolStatus, SqlitePool};
pub use repository::AuthRepository;
pub use scope::{ScopeMode, TransactionScope};

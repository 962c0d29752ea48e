#![allow(dead_code)]

use campus_auth::config::{HashingConfig, PoolConfig};
use campus_auth::{AuthError, AuthenticationService, CredentialVerifier, PoolManager};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, FromRow, SqliteConnection};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

pub const ADMIN_KEY: &str = "test-admin-key";

/// Subset of the campus schema touched by the auth layer.
pub const CAMPUS_SCHEMA: &str = r#"
CREATE TABLE mdl_user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    firstname TEXT NULL,
    lastname TEXT NULL,
    email TEXT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    suspended INTEGER NOT NULL DEFAULT 0,
    timemodified INTEGER NOT NULL DEFAULT 0
);
CREATE UNIQUE INDEX idx_mdl_user_active_username ON mdl_user(username) WHERE deleted = 0;

CREATE TABLE mdl_role (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    shortname TEXT NOT NULL UNIQUE
);

CREATE TABLE mdl_role_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    roleid INTEGER NOT NULL REFERENCES mdl_role(id),
    userid INTEGER NOT NULL REFERENCES mdl_user(id)
);

CREATE TABLE login_audit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username_attempted TEXT NOT NULL,
    client_ip TEXT NULL,
    client_agent TEXT NULL,
    succeeded INTEGER NOT NULL,
    occurred_at TEXT NOT NULL
);
"#;

/// One `login_audit` row as written by the service.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub id: i64,
    pub username_attempted: String,
    pub client_ip: Option<String>,
    pub client_agent: Option<String>,
    pub succeeded: bool,
    pub occurred_at: DateTime<Utc>,
}

/// A throwaway SQLite database carrying the campus schema.
pub struct TestDb {
    _dir: TempDir,
    pub url: String,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("campus.sqlite").display());

        let mut conn = SqliteConnectOptions::from_str(&url)
            .expect("bad sqlite url")
            .create_if_missing(true)
            .connect()
            .await
            .expect("failed to create database");
        sqlx::raw_sql(CAMPUS_SCHEMA)
            .execute(&mut conn)
            .await
            .expect("failed to apply schema");

        Self { _dir: dir, url }
    }

    /// Side-channel connection for seeding and inspecting rows.
    pub async fn conn(&self) -> SqliteConnection {
        SqliteConnectOptions::from_str(&self.url)
            .expect("bad sqlite url")
            .connect()
            .await
            .expect("failed to connect")
    }

    pub fn pool(&self, max_connections: u32, acquire_timeout_secs: u64) -> Arc<PoolManager> {
        Arc::new(
            PoolManager::new(
                &self.url,
                PoolConfig {
                    min_connections: 0,
                    max_connections,
                    acquire_timeout_secs,
                },
            )
            .expect("valid database url"),
        )
    }

    pub fn service(&self) -> AuthenticationService {
        AuthenticationService::new(self.pool(5, 5), verifier(), ADMIN_KEY)
    }

    pub async fn seed_user(&self, username: &str, email: &str, password: &str) -> i64 {
        let hash = verifier().hash(password).expect("hash");
        let mut conn = self.conn().await;
        sqlx::query(
            "INSERT INTO mdl_user (username, password, firstname, lastname, email) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(hash)
        .bind(format!("{username}-first"))
        .bind(format!("{username}-last"))
        .bind(email)
        .execute(&mut conn)
        .await
        .expect("insert user")
        .last_insert_rowid()
    }

    pub async fn assign_role(&self, user_id: i64, name: &str, shortname: &str) -> i64 {
        let mut conn = self.conn().await;
        let role_id = sqlx::query("INSERT INTO mdl_role (name, shortname) VALUES (?, ?)")
            .bind(name)
            .bind(shortname)
            .execute(&mut conn)
            .await
            .expect("insert role")
            .last_insert_rowid();
        sqlx::query("INSERT INTO mdl_role_assignments (roleid, userid) VALUES (?, ?)")
            .bind(role_id)
            .bind(user_id)
            .execute(&mut conn)
            .await
            .expect("assign role");
        role_id
    }

    pub async fn set_flag(&self, user_id: i64, column: &str, value: bool) {
        let mut conn = self.conn().await;
        sqlx::query(&format!("UPDATE mdl_user SET {column} = ? WHERE id = ?"))
            .bind(value)
            .bind(user_id)
            .execute(&mut conn)
            .await
            .expect("update flag");
    }

    pub async fn password_hashes(&self) -> Vec<(i64, String)> {
        let mut conn = self.conn().await;
        sqlx::query_as("SELECT id, password FROM mdl_user ORDER BY id")
            .fetch_all(&mut conn)
            .await
            .expect("select hashes")
    }

    pub async fn audit_rows(&self) -> Vec<(String, bool)> {
        let mut conn = self.conn().await;
        sqlx::query_as("SELECT username_attempted, succeeded FROM login_audit ORDER BY id")
            .fetch_all(&mut conn)
            .await
            .expect("select audit rows")
    }

    /// Full audit rows for one username, oldest first.
    pub async fn audit_trail(&self, username: &str) -> Vec<AuditRow> {
        let mut conn = self.conn().await;
        sqlx::query_as(
            "SELECT id, username_attempted, client_ip, client_agent, succeeded, occurred_at \
             FROM login_audit WHERE username_attempted = ? ORDER BY id",
        )
        .bind(username)
        .fetch_all(&mut conn)
        .await
        .expect("select audit trail")
    }

    pub async fn execute(&self, sql: &str) {
        let mut conn = self.conn().await;
        sqlx::raw_sql(sql)
            .execute(&mut conn)
            .await
            .expect("raw statement");
    }
}

pub fn verifier() -> CredentialVerifier {
    CredentialVerifier::new(&HashingConfig::default()).expect("default hashing params")
}

/// Row count of `mdl_user`, usable inside a transaction scope.
pub async fn count_users(conn: &mut SqliteConnection) -> Result<i64, AuthError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mdl_user")
        .fetch_one(conn)
        .await?;
    Ok(count)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Stored identity plus password hash, decoded from `mdl_user`.
#[derive(Clone, FromRow)]
pub struct Credential {
    #[sqlx(rename = "id")]
    pub subject_id: i64,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    #[sqlx(rename = "deleted")]
    pub is_deleted: bool,
    #[sqlx(rename = "suspended")]
    pub is_suspended: bool,
}

// Hand-written so the hash never reaches a log line.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("subject_id", &self.subject_id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("email", &self.email)
            .field("is_deleted", &self.is_deleted)
            .field("is_suspended", &self.is_suspended)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleAssignment {
    pub id: i64,
    pub name: String,
    pub shortname: String,
}

/// Network metadata of the caller attempting to authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Audit row about to be written.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub username: String,
    pub client: ClientInfo,
    pub succeeded: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Identity returned by a successful login. Never carries the hash.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedSubject {
    pub subject_id: i64,
    pub username: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<RoleAssignment>,
}

impl AuthenticatedSubject {
    pub fn new(credential: Credential, roles: Vec<RoleAssignment>) -> Self {
        Self {
            subject_id: credential.subject_id,
            username: credential.username,
            firstname: credential.firstname,
            lastname: credential.lastname,
            email: credential.email,
            roles,
        }
    }
}

/// Field used to locate a credential for a password update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Username(String),
    Email(String),
}

impl Identifier {
    /// Anything containing `@` is an email; everything else a username.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.contains('@') {
            Some(Self::Email(raw.to_string()))
        } else {
            Some(Self::Username(raw.to_string()))
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(u) => write!(f, "username {u}"),
            Self::Email(e) => write!(f, "email {e}"),
        }
    }
}

use crate::db::models::{Credential, Identifier, LoginAttempt, RoleAssignment};
use crate::error::AuthError;
use chrono::Utc;
use sqlx::SqliteConnection;

const CREDENTIAL_COLUMNS: &str =
    "id, username, password, firstname, lastname, email, deleted, suspended";

/// Raw-SQL access to credentials, role assignments and the login audit trail.
///
/// Every method runs on a connection borrowed from an open transaction, so callers
/// decide the unit of work through `TransactionScope`.
pub struct AuthRepository;

impl AuthRepository {
    pub async fn find_active_by_username(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<Option<Credential>, AuthError> {
        let sql = format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM mdl_user WHERE username = ? AND deleted = 0"
        );
        let row = sqlx::query_as::<_, Credential>(&sql)
            .bind(username)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    pub async fn find_active_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<Option<Credential>, AuthError> {
        // Emails are not unique in the campus schema; oldest account wins.
        let sql = format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM mdl_user WHERE email = ? AND deleted = 0 ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, Credential>(&sql)
            .bind(email)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    pub async fn find_active(
        conn: &mut SqliteConnection,
        identifier: &Identifier,
    ) -> Result<Option<Credential>, AuthError> {
        match identifier {
            Identifier::Username(username) => Self::find_active_by_username(conn, username).await,
            Identifier::Email(email) => Self::find_active_by_email(conn, email).await,
        }
    }

    pub async fn roles_for_subject(
        conn: &mut SqliteConnection,
        subject_id: i64,
    ) -> Result<Vec<RoleAssignment>, AuthError> {
        let rows = sqlx::query_as::<_, RoleAssignment>(
            r#"SELECT r.id, r.name, r.shortname
               FROM mdl_role_assignments ra
               JOIN mdl_role r ON ra.roleid = r.id
               WHERE ra.userid = ?
               ORDER BY r.id"#,
        )
        .bind(subject_id)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    /// Returns the number of rows touched (0 or 1).
    pub async fn update_password_hash(
        conn: &mut SqliteConnection,
        subject_id: i64,
        password_hash: &str,
    ) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE mdl_user SET password = ?, timemodified = ? WHERE id = ? AND deleted = 0",
        )
        .bind(password_hash)
        .bind(Utc::now().timestamp())
        .bind(subject_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Overwrite the hash of every non-deleted credential. Returns the row count.
    pub async fn update_all_active_hashes(
        conn: &mut SqliteConnection,
        password_hash: &str,
    ) -> Result<u64, AuthError> {
        let result =
            sqlx::query("UPDATE mdl_user SET password = ?, timemodified = ? WHERE deleted = 0")
                .bind(password_hash)
                .bind(Utc::now().timestamp())
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }

    /// Append one audit row. Returns the row id.
    pub async fn insert_audit(
        conn: &mut SqliteConnection,
        attempt: &LoginAttempt,
    ) -> Result<i64, AuthError> {
        let result = sqlx::query(
            r#"INSERT INTO login_audit (
                username_attempted, client_ip, client_agent, succeeded, occurred_at
            ) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&attempt.username)
        .bind(attempt.client.ip.as_deref())
        .bind(attempt.client.user_agent.as_deref())
        .bind(attempt.succeeded)
        .bind(attempt.occurred_at)
        .execute(conn)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

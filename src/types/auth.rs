use serde::{Deserialize, Serialize};

use crate::db::models::{AuthenticatedSubject, RoleAssignment};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid credentials";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login reply. Identity fields are always present, `null` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user_id: i64,
    pub username: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<RoleAssignment>,
    pub message: String,
}

impl From<AuthenticatedSubject> for LoginResponse {
    fn from(s: AuthenticatedSubject) -> Self {
        Self {
            success: true,
            user_id: s.subject_id,
            username: s.username,
            firstname: s.firstname,
            lastname: s.lastname,
            email: s.email,
            roles: s.roles,
            message: "login successful".to_string(),
        }
    }
}

/// Failed login reply, identical whatever the cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRejection {
    pub success: bool,
    pub message: String,
}

impl Default for LoginRejection {
    fn default() -> Self {
        Self {
            success: false,
            message: INVALID_CREDENTIALS_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    /// Email address, or username when it contains no `@`.
    pub identifier: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePasswordResponse {
    pub success: bool,
    pub user_id: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkResetRequest {
    pub admin_key: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResetResponse {
    pub success: bool,
    pub count: u64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_body_has_no_identity_fields() {
        let body = serde_json::to_value(LoginRejection::default()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": false, "message": "invalid credentials"})
        );
    }

    #[test]
    fn success_body_keeps_unset_identity_fields_as_null() {
        let subject = AuthenticatedSubject {
            subject_id: 7,
            username: "frank".into(),
            firstname: Some("Frank".into()),
            lastname: None,
            email: Some("frank@x.com".into()),
            roles: vec![RoleAssignment {
                id: 5,
                name: "Student".into(),
                shortname: "student".into(),
            }],
        };
        let body = serde_json::to_value(LoginResponse::from(subject)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["user_id"], 7);
        assert_eq!(body["roles"][0]["shortname"], "student");
        assert_eq!(body["lastname"], serde_json::Value::Null);
        assert!(body.as_object().unwrap().contains_key("lastname"));
        assert!(body.get("password_hash").is_none());
    }
}

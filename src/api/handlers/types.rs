//! Request/response types for the auth endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct SignInRequest {
    pub username: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct SignUpRequest {
    pub username: String,
    /// Display name; defaults to the username when omitted.
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
    #[schema(value_type = String, format = Password)]
    pub confirm_password: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub display_name: String,
    pub role: String,
}

/// Error payload; `field` is set for field-specific sign-up failures and
/// absent for generic ones (sign-in never names a field).
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldError, SignInRequest, SignUpRequest};
    use anyhow::Result;
    use secrecy::ExposeSecret;

    #[test]
    fn sign_in_request_defaults_remember_me() -> Result<()> {
        let request: SignInRequest =
            serde_json::from_str(r#"{"username": "bob", "password": "Password123"}"#)?;
        assert_eq!(request.username, "bob");
        assert_eq!(request.password.expose_secret(), "Password123");
        assert!(!request.remember_me);
        Ok(())
    }

    #[test]
    fn sign_up_request_debug_redacts_the_password() -> Result<()> {
        let request: SignUpRequest = serde_json::from_str(
            r#"{"username": "bob", "email": "bob@example.com",
                "password": "Password123", "confirm_password": "Password123"}"#,
        )?;
        let debug = format!("{request:?}");
        assert!(!debug.contains("Password123"));
        Ok(())
    }

    #[test]
    fn field_error_omits_absent_field() -> Result<()> {
        let json = serde_json::to_value(FieldError::generic("nope"))?;
        assert!(json.get("field").is_none());
        let json = serde_json::to_value(FieldError::new("email", "taken"))?;
        assert_eq!(json["field"], "email");
        Ok(())
    }
}

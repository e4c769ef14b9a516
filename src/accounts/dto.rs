use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::accounts::error::{AccountError, ErrorKind};
use crate::accounts::repo_types::{AccountStatus, User};
use crate::accounts::services::{AccountChanges, RegisterInput};

/// Request body for registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(r: RegisterRequest) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            password: r.password,
        }
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for asking a password reset link.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// Request body for account modification. `password` is the current one.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyAccountRequest {
    pub email: String,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub new_password: Option<String>,
}

impl ModifyAccountRequest {
    pub fn into_changes(self) -> (String, AccountChanges) {
        (
            self.email,
            AccountChanges {
                current_password: self.password,
                first_name: self.first_name,
                last_name: self.last_name,
                new_password: self.new_password,
            },
        )
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub account_status: AccountStatus,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            roles: u.roles.clone(),
            account_status: u.account_status,
        }
    }
}

/// Uniform outcome of every account operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_kind: None,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// A success that still carries a warning kind, e.g. an account that
    /// was created although its confirmation email was not delivered.
    pub fn ok_with_warning(err: &AccountError) -> Self {
        Self {
            success: true,
            message: err.public_message(),
            error_kind: Some(err.kind()),
            details: None,
        }
    }
}

impl From<&AccountError> for ServiceResult {
    fn from(err: &AccountError) -> Self {
        let details = match err {
            AccountError::InvalidField { field, .. } => Some(json!({ "field": field })),
            _ => None,
        };
        Self {
            success: false,
            message: err.public_message(),
            error_kind: Some(err.kind()),
            details,
        }
    }
}

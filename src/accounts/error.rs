use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::accounts::notifier::NotifyError;
use crate::accounts::password::HashError;
use crate::accounts::repo::StoreError;

/// Stable, serializable failure kind carried by every `ServiceResult`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationError,
    DuplicateAccount,
    UserNotFound,
    TokenNotFound,
    EmailNotConfirmed,
    InvalidCredentials,
    InvalidCurrentPassword,
    InvalidField,
    TokenGenerationFailed,
    NotificationDeliveryFailed,
    ConfirmationDeliveryFailed,
    Internal,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("an account with this email address already exists")]
    DuplicateAccount,

    #[error("user not found")]
    UserNotFound,

    #[error("token not found")]
    TokenNotFound,

    #[error("email address not confirmed")]
    EmailNotConfirmed,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid current password")]
    InvalidCurrentPassword,

    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("failed to generate the reset token")]
    TokenGenerationFailed,

    #[error("failed to deliver notification: {0}")]
    NotificationDeliveryFailed(#[source] NotifyError),

    /// Account was created but the confirmation email could not be sent.
    #[error("account created but the confirmation email could not be sent: {0}")]
    ConfirmationDeliveryFailed(#[source] NotifyError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::Validation(_) => ErrorKind::ValidationError,
            AccountError::DuplicateAccount => ErrorKind::DuplicateAccount,
            AccountError::UserNotFound => ErrorKind::UserNotFound,
            AccountError::TokenNotFound => ErrorKind::TokenNotFound,
            AccountError::EmailNotConfirmed => ErrorKind::EmailNotConfirmed,
            AccountError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AccountError::InvalidCurrentPassword => ErrorKind::InvalidCurrentPassword,
            AccountError::InvalidField { .. } => ErrorKind::InvalidField,
            AccountError::TokenGenerationFailed => ErrorKind::TokenGenerationFailed,
            AccountError::NotificationDeliveryFailed(_) => ErrorKind::NotificationDeliveryFailed,
            AccountError::ConfirmationDeliveryFailed(_) => ErrorKind::ConfirmationDeliveryFailed,
            AccountError::Storage(_) | AccountError::Hashing(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ValidationError | ErrorKind::InvalidField => StatusCode::BAD_REQUEST,
            ErrorKind::DuplicateAccount => StatusCode::CONFLICT,
            ErrorKind::UserNotFound | ErrorKind::TokenNotFound => StatusCode::NOT_FOUND,
            ErrorKind::EmailNotConfirmed => StatusCode::FORBIDDEN,
            ErrorKind::InvalidCredentials | ErrorKind::InvalidCurrentPassword => {
                StatusCode::UNAUTHORIZED
            }
            ErrorKind::NotificationDeliveryFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::ConfirmationDeliveryFailed => StatusCode::CREATED,
            ErrorKind::TokenGenerationFailed | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand to an untrusted caller.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal error".to_string(),
            ErrorKind::NotificationDeliveryFailed => "failed to deliver notification".to_string(),
            ErrorKind::ConfirmationDeliveryFailed => {
                "account created but the confirmation email could not be sent".to_string()
            }
            _ => self.to_string(),
        }
    }
}

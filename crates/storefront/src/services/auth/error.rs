//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ringside_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The backend refused the request with a message for the user.
    #[error("{0}")]
    Rejected(String),

    /// Tokens are gone or can no longer be refreshed.
    #[error("session expired")]
    SessionExpired,

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(ApiError),

    /// Session store error.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Message to show on the sign-in and registration forms.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Enter a valid email address".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::UserAlreadyExists => "An account with this email already exists".to_string(),
            Self::WeakPassword(msg) | Self::Rejected(msg) => msg.clone(),
            Self::PasswordMismatch => "Passwords do not match".to_string(),
            Self::SessionExpired => "Your session expired, please sign in again".to_string(),
            Self::Backend(_) | Self::Session(_) => {
                "Sign-in is unavailable right now, please try again shortly".to_string()
            }
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => Self::InvalidCredentials,
            ApiError::Status { status: 409, .. } => Self::UserAlreadyExists,
            ApiError::Status { status, message } if status < 500 && !message.is_empty() => {
                Self::Rejected(message)
            }
            other => Self::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_statuses_classify() {
        assert!(matches!(AuthError::from(ApiError::Unauthorized), AuthError::InvalidCredentials));
        assert!(matches!(
            AuthError::from(ApiError::Status {
                status: 409,
                message: "taken".to_string()
            }),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            AuthError::from(ApiError::Status {
                status: 422,
                message: "name is required".to_string()
            }),
            AuthError::Rejected(msg) if msg == "name is required"
        ));
        assert!(matches!(
            AuthError::from(ApiError::Status {
                status: 502,
                message: "bad gateway".to_string()
            }),
            AuthError::Backend(_)
        ));
    }
}

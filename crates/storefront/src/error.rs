//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ringside_core::{CartError, ProgressError};
use thiserror::Error;

use crate::api::ApiError;
use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Cart mutation was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Lesson progress update was rejected.
    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Api(err) => api_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch
                | AuthError::Rejected(_) => StatusCode::BAD_REQUEST,
                AuthError::Backend(err) => api_status(err),
                AuthError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(CartError::ItemNotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Progress(ProgressError::UnknownPage(..)) => StatusCode::NOT_FOUND,
            Self::Progress(ProgressError::Locked(..)) => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message shown to the visitor. Internal details never leave the server.
    fn public_message(&self) -> String {
        match self {
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Api(err) | Self::Auth(AuthError::Backend(err)) => err
                .user_message()
                .map_or_else(|| "The training service is unavailable".to_string(), String::from),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::SessionExpired => "Your session expired, please sign in again".to_string(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Session(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Self::Cart(err) => err.to_string(),
            Self::Progress(ProgressError::Locked(..)) => {
                "Finish the previous page before moving on".to_string()
            }
            Self::Progress(ProgressError::UnknownPage(..)) => "Lesson page not found".to_string(),
            _ => self.to_string(),
        }
    }
}

fn api_status(err: &ApiError) -> StatusCode {
    match err {
        ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        ApiError::Status { status, .. } if *status < 500 => StatusCode::BAD_REQUEST,
        ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

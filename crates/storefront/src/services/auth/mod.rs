//! Authentication service.
//!
//! Accounts live in the backend. This service trades credentials for a
//! token pair, keeps the pair in the session, refreshes it when it runs out,
//! and mirrors the profile into the session for page rendering.

mod error;

pub use error::AuthError;

use chrono::Utc;
use ringside_core::{Email, UserProfile};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::api::types::{LoginRequest, RegisterRequest, TokenResponse};
use crate::api::{ApiClient, ApiError};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{AuthTokens, CurrentUser, session_keys};
use crate::services::purchases;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Session keys dropped on sign-out. The cart survives.
const SIGNED_IN_KEYS: [&str; 6] = [
    session_keys::AUTH_TOKENS,
    session_keys::PURCHASED_COURSES,
    session_keys::PROGRESS,
    session_keys::RETURN_TO,
    session_keys::CHAT_HISTORY,
    session_keys::LAST_ORDER,
];

/// Authentication service.
pub struct AuthService<'a> {
    api: &'a ApiClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    // =========================================================================
    // Sign-in
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the backend rejects the pair.
    #[instrument(skip(self, session, password))]
    pub async fn login(&self, session: &Session, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let response = self
            .api
            .login(&LoginRequest {
                email: email.as_str(),
                password,
            })
            .await?;

        self.establish(session, response).await
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, session, password, password_confirm))]
    pub async fn register(
        &self,
        session: &Session,
        name: &str,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let name = name.trim();
        let name = if name.is_empty() { email.local_part() } else { name };

        let response = self
            .api
            .register(&RegisterRequest {
                name,
                email: email.as_str(),
                password,
            })
            .await?;

        self.establish(session, response).await
    }

    /// Store a freshly issued token pair and the profile behind it.
    ///
    /// The session ID is rotated so a pre-login cookie cannot ride along.
    async fn establish(&self, session: &Session, response: TokenResponse) -> Result<CurrentUser, AuthError> {
        session.cycle_id().await?;

        let tokens = AuthTokens::issued(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            Utc::now(),
        );

        let profile = match response.user {
            Some(profile) => profile,
            None => self.api.me(&tokens.access_token).await.map_err(AuthError::Backend)?,
        };

        session.insert(session_keys::AUTH_TOKENS, &tokens).await?;
        let user = remember_profile(session, &profile).await?;

        info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Current access token, refreshed first if it has expired.
    ///
    /// Returns `Ok(None)` for anonymous visitors.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the refresh token was rejected;
    /// the visitor is signed out in that case.
    pub async fn access_token(&self, session: &Session) -> Result<Option<String>, AuthError> {
        let Some(tokens) = session.get::<AuthTokens>(session_keys::AUTH_TOKENS).await? else {
            return Ok(None);
        };

        if !tokens.is_expired(Utc::now()) {
            return Ok(Some(tokens.access_token));
        }

        self.refresh(session, &tokens).await.map(Some)
    }

    /// Like [`Self::access_token`] but an anonymous visitor is an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if there is no usable token.
    pub async fn require_token(&self, session: &Session) -> Result<String, AuthError> {
        self.access_token(session).await?.ok_or(AuthError::SessionExpired)
    }

    async fn refresh(&self, session: &Session, tokens: &AuthTokens) -> Result<String, AuthError> {
        match self.api.refresh(&tokens.refresh_token).await {
            Ok(response) => {
                let renewed = AuthTokens::issued(
                    response.access_token,
                    response.refresh_token,
                    response.expires_in,
                    Utc::now(),
                );
                session.insert(session_keys::AUTH_TOKENS, &renewed).await?;
                Ok(renewed.access_token)
            }
            Err(e) if e.is_unavailable() => Err(AuthError::Backend(e)),
            Err(e) => {
                warn!(error = %e, "Refresh token rejected, signing out");
                Self::logout(session).await?;
                Err(AuthError::SessionExpired)
            }
        }
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Re-read the profile from the backend and update the session copy.
    ///
    /// A rejected access token is refreshed once and the call retried.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the retry is also rejected, or
    /// `AuthError::Backend` if the backend is unavailable.
    pub async fn refresh_profile(&self, session: &Session) -> Result<Option<UserProfile>, AuthError> {
        let Some(token) = self.access_token(session).await? else {
            return Ok(None);
        };

        let profile = match self.api.me(&token).await {
            Ok(profile) => profile,
            Err(ApiError::Unauthorized) => {
                let Some(tokens) = session.get::<AuthTokens>(session_keys::AUTH_TOKENS).await? else {
                    return Err(AuthError::SessionExpired);
                };
                let token = self.refresh(session, &tokens).await?;
                match self.api.me(&token).await {
                    Ok(profile) => profile,
                    Err(ApiError::Unauthorized) => {
                        Self::logout(session).await?;
                        return Err(AuthError::SessionExpired);
                    }
                    Err(e) => return Err(AuthError::Backend(e)),
                }
            }
            Err(e) => return Err(AuthError::Backend(e)),
        };

        remember_profile(session, &profile).await?;
        Ok(Some(profile))
    }

    // =========================================================================
    // Sign-out
    // =========================================================================

    /// Forget everything tied to the signed-in account. The cart is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn logout(session: &Session) -> Result<(), AuthError> {
        clear_current_user(session).await?;
        for key in SIGNED_IN_KEYS {
            session.remove_value(key).await?;
        }
        session.cycle_id().await?;
        clear_sentry_user();
        Ok(())
    }
}

/// Mirror a backend profile into the session.
async fn remember_profile(session: &Session, profile: &UserProfile) -> Result<CurrentUser, AuthError> {
    let user = CurrentUser::from(profile);
    set_current_user(session, &user).await?;
    purchases::merge(session, profile.purchased_course_ids.iter().copied()).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use ringside_core::{ChatTurn, CourseId};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::LastOrder;
    use crate::services::cart;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("longpassword123").is_ok());
        assert!(matches!(validate_password("short"), Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_logout_keeps_cart() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let tokens = AuthTokens::issued("a".into(), "r".into(), 3600, Utc::now());
        session.insert(session_keys::AUTH_TOKENS, &tokens).await.unwrap();
        purchases::merge(&session, [CourseId::new(1)]).await.unwrap();
        cart::save(&session, &ringside_core::Cart::new()).await.unwrap();

        AuthService::logout(&session).await.unwrap();

        assert!(session.get::<AuthTokens>(session_keys::AUTH_TOKENS).await.unwrap().is_none());
        assert!(purchases::load(&session).await.is_empty());
        assert!(session.get::<ringside_core::Cart>(session_keys::CART).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_forgets_chat_and_last_order() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session
            .insert(session_keys::CHAT_HISTORY, vec![ChatTurn::user("How do I slip a jab?")])
            .await
            .unwrap();
        let order = LastOrder {
            order_number: "RS-1A2B3C4D".to_string(),
            email: "ali@example.com".to_string(),
            total: "$27.97".to_string(),
            item_count: 2,
            offline: true,
        };
        session.insert(session_keys::LAST_ORDER, &order).await.unwrap();

        AuthService::logout(&session).await.unwrap();

        assert!(session.get::<Vec<ChatTurn>>(session_keys::CHAT_HISTORY).await.unwrap().is_none());
        assert!(session.get::<LastOrder>(session_keys::LAST_ORDER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_anonymous_visitor_has_no_token() {
        let api = ApiClient::new(&crate::config::ApiConfig::new("http://127.0.0.1:9".parse().unwrap())).unwrap();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let service = AuthService::new(&api);

        assert!(service.access_token(&session).await.unwrap().is_none());
        assert!(matches!(
            service.require_token(&session).await,
            Err(AuthError::SessionExpired)
        ));
    }
}

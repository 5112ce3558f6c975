//! Types stored in the visitor session.
//!
//! The session plays the role browser local storage would in a client-side
//! app: per-visitor, survives navigation, no durability promise.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use ringside_core::{Email, UserId, UserProfile};

/// Seconds before expiry at which an access token is treated as expired.
const EXPIRY_SKEW_SECONDS: i64 = 30;

/// Longest token lifetime accepted from the backend (30 days).
const MAX_TOKEN_LIFETIME_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Session-stored user identity, cached from the profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Name to greet the user with.
    pub display_name: String,
}

impl From<&UserProfile> for CurrentUser {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            display_name: profile.display_name().to_string(),
        }
    }
}

/// Backend token pair.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthTokens {
    /// Build from a lifetime in seconds, measured from `now`.
    ///
    /// The lifetime is clamped to `0..=30 days`; a value that still cannot be
    /// represented yields a token that is already expired.
    #[must_use]
    pub fn issued(access_token: String, refresh_token: String, expires_in: i64, now: DateTime<Utc>) -> Self {
        let expires_at = TimeDelta::try_seconds(expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECONDS))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(now);
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Whether the access token should be refreshed before use.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        TimeDelta::try_seconds(EXPIRY_SKEW_SECONDS)
            .and_then(|skew| now.checked_add_signed(skew))
            .is_none_or(|deadline| deadline >= self.expires_at)
    }
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Summary of the last placed order, shown on the confirmation page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastOrder {
    pub order_number: String,
    pub email: String,
    pub total: String,
    pub item_count: u32,
    /// True when the backend was unreachable and the number was made up locally.
    pub offline: bool,
}

/// Session keys.
pub mod keys {
    /// Key for the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the backend token pair.
    pub const AUTH_TOKENS: &str = "auth_tokens";

    /// Key for the cart.
    pub const CART: &str = "cart";

    /// Key for the purchased course set.
    pub const PURCHASED_COURSES: &str = "purchased_courses";

    /// Key for lesson progress of every course.
    pub const PROGRESS: &str = "progress";

    /// Key for the chat conversation.
    pub const CHAT_HISTORY: &str = "chat_history";

    /// Key for the one-shot notice.
    pub const FLASH: &str = "flash";

    /// Key for the last order summary.
    pub const LAST_ORDER: &str = "last_order";

    /// Key for the page to return to after signing in.
    pub const RETURN_TO: &str = "return_to";
}

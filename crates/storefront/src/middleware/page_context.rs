//! Per-request data every page layout needs.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::services::{Flash, cart, flash};

/// Header and notice data for the base layout.
///
/// Extracting this consumes the pending flash notice, so only extract it in
/// handlers that render a page. Handlers that may redirect first should call
/// [`PageContext::load`] once they know they will render.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
    /// Set by handlers that rendered bundled catalog data.
    pub offline: bool,
}

impl PageContext {
    #[must_use]
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline |= offline;
        self
    }

    #[must_use]
    pub fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Read the layout data from the session, taking the pending notice.
    pub async fn load(session: &Session) -> Self {
        Self {
            user: session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            cart_count: cart::count(session).await,
            flash: flash::take(session).await,
            offline: false,
        }
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Session>() {
            Some(session) => Ok(Self::load(session).await),
            None => Ok(Self::default()),
        }
    }
}

//! One-shot notices carried across a redirect.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Error,
}

impl FlashLevel {
    /// CSS modifier used by the base template.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Info => "flash-info",
            Self::Success => "flash-success",
            Self::Error => "flash-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Queue a notice for the next page render.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn set(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FLASH, flash).await
}

/// Queue a notice unless an earlier one is still waiting to be shown.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn set_if_empty(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    if session.get::<Flash>(session_keys::FLASH).await?.is_some() {
        return Ok(());
    }
    set(session, flash).await
}

/// Take the queued notice, if any. A notice is shown once.
///
/// Unreadable values are dropped rather than failing the page.
pub async fn take(session: &Session) -> Option<Flash> {
    session.remove::<Flash>(session_keys::FLASH).await.ok().flatten()
}

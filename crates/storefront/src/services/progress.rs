//! Lesson progress.
//!
//! Progress for every course lives under one session key so sign-out can
//! drop it in one go. When the learner is signed in, completions are also
//! reported to the backend on a best-effort basis and backend progress is
//! merged in when the player opens.

use std::collections::BTreeMap;

use ringside_core::{CourseId, CourseOutline, CourseProgress, PageRef};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::AppError;
use crate::models::session_keys;

/// Progress of every course the visitor has opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressBook(BTreeMap<CourseId, CourseProgress>);

impl ProgressBook {
    /// Progress of one course; empty if never opened.
    #[must_use]
    pub fn course(&self, id: CourseId) -> CourseProgress {
        self.0.get(&id).cloned().unwrap_or_default()
    }

    pub fn course_mut(&mut self, id: CourseId) -> &mut CourseProgress {
        self.0.entry(id).or_default()
    }
}

/// Load the progress book. A missing or unreadable value is empty.
pub async fn load(session: &Session) -> ProgressBook {
    match session.get::<ProgressBook>(session_keys::PROGRESS).await {
        Ok(book) => book.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Discarding unreadable progress");
            ProgressBook::default()
        }
    }
}

/// Persist the progress book.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn save(session: &Session, book: &ProgressBook) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::PROGRESS, book).await
}

/// Merge backend progress for a course into the session and return the
/// combined progress. Backend failures leave local progress as is.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn sync_from_backend(
    api: &ApiClient,
    session: &Session,
    token: Option<&str>,
    course_id: CourseId,
    outline: &CourseOutline,
) -> Result<CourseProgress, tower_sessions::session::Error> {
    let mut book = load(session).await;

    if let Some(token) = token {
        match api.get_progress(token, course_id).await {
            Ok(pages) => {
                debug!(course_id = %course_id, pages = pages.len(), "Merged backend progress");
                book.course_mut(course_id).merge(outline, pages);
                save(session, &book).await?;
            }
            Err(e) => warn!(error = %e, course_id = %course_id, "Backend progress unavailable"),
        }
    }

    Ok(book.course(course_id))
}

/// Mark a page complete and return the page to show next.
///
/// The local record is authoritative; the backend is told when a token is
/// available and a failure there is only logged.
///
/// # Errors
///
/// Returns [`AppError::Progress`] if the page is unknown or still locked, or
/// [`AppError::Session`] if the session cannot be written.
pub async fn complete(
    api: &ApiClient,
    session: &Session,
    token: Option<&str>,
    course_id: CourseId,
    outline: &CourseOutline,
    at: PageRef,
) -> Result<Option<PageRef>, AppError> {
    let mut book = load(session).await;
    let next = book.course_mut(course_id).complete(outline, at)?;
    save(session, &book).await?;

    if let Some(token) = token
        && let Err(e) = api.record_progress(token, at).await
    {
        warn!(error = %e, course_id = %course_id, lesson_id = %at.lesson_id, "Failed to report progress");
    }

    Ok(next)
}

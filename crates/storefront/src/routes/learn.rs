//! Lesson player.
//!
//! Pages unlock in order: a page opens once the page before it is complete.
//! Asking for a locked page lands on the resume point instead.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use ringside_core::{
    CourseId, CourseOutline, CourseProgress, Lesson, LessonId, PageRef, PageState, ProgressError,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::PageContext;
use crate::services::{AuthService, Catalog, Flash, flash, progress, purchases};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// One page link in the sidebar.
#[derive(Clone)]
pub struct PageLinkView {
    pub number: u32,
    pub href: String,
    pub completed: bool,
    pub locked: bool,
    pub current: bool,
}

/// One lesson in the sidebar.
#[derive(Clone)]
pub struct LessonNavView {
    pub title: String,
    pub completed: bool,
    pub pages: Vec<PageLinkView>,
}

/// The page being shown.
#[derive(Clone)]
pub struct CurrentPageView {
    pub lesson_id: LessonId,
    pub lesson_title: String,
    pub video_url: Option<String>,
    /// Video is hosted by an embeddable player rather than a plain file.
    pub video_embed: bool,
    pub page: u32,
    pub page_number: u32,
    pub page_count: u32,
    pub title: Option<String>,
    pub body: String,
    pub completed: bool,
    pub next_href: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "learn/player.html")]
pub struct PlayerTemplate {
    pub page: PageContext,
    pub course_id: CourseId,
    pub course_title: String,
    pub percent: u8,
    pub course_complete: bool,
    pub lessons: Vec<LessonNavView>,
    pub current: Option<CurrentPageView>,
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    pub lesson: Option<LessonId>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteForm {
    pub lesson_id: LessonId,
    pub page: u32,
}

fn page_href(course_id: CourseId, at: PageRef) -> String {
    format!("/courses/{course_id}/learn?lesson={}&page={}", at.lesson_id, at.page)
}

/// Send non-owners back to the course page with a notice.
async fn require_purchase(session: &Session, course_id: CourseId) -> Result<Option<Response>> {
    if purchases::owns(session, course_id).await {
        return Ok(None);
    }
    flash::set_if_empty(session, Flash::info("Purchase this course to start learning.")).await?;
    Ok(Some(Redirect::to(&format!("/courses/{course_id}")).into_response()))
}

/// Access token if signed in; token trouble only costs the backend sync.
async fn optional_token(state: &AppState, session: &Session) -> Option<String> {
    match AuthService::new(state.api()).access_token(session).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "No usable access token for progress sync");
            None
        }
    }
}

/// Show a lesson page.
///
/// The layout context is read only once no redirect is due, so a pending
/// notice survives the redirect.
#[instrument(skip(state, session))]
pub async fn player(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    Query(query): Query<PlayerQuery>,
    session: Session,
) -> Result<Response> {
    let catalog = Catalog::from_state(&state);
    let course = catalog
        .course(course_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("course {course_id}")))?;

    if let Some(redirect) = require_purchase(&session, course_id).await? {
        return Ok(redirect);
    }

    let lessons = catalog.lessons(course_id).await;
    let outline = CourseOutline::from_lessons(&lessons.value);
    let token = optional_token(&state, &session).await;
    let progress =
        progress::sync_from_backend(state.api(), &session, token.as_deref(), course_id, &outline).await?;

    let requested = query
        .lesson
        .map(|lesson_id| PageRef::new(lesson_id, query.page.unwrap_or(0)));
    let resume = progress.resume_point(&outline);

    let current = match requested {
        Some(at) => match progress.page_state(&outline, at) {
            Ok(PageState::Locked) => {
                let target = resume.map_or_else(
                    || format!("/courses/{course_id}/learn"),
                    |r| page_href(course_id, r),
                );
                flash::set_if_empty(&session, Flash::info("Finish the previous page first.")).await?;
                return Ok(Redirect::to(&target).into_response());
            }
            Ok(_) => Some(at),
            Err(ProgressError::UnknownPage(..)) => {
                return Err(AppError::NotFound("lesson page".to_string()));
            }
            Err(e) => return Err(e.into()),
        },
        None => resume,
    };

    let page = PageContext::load(&session).await;
    let template = PlayerTemplate {
        page: page.with_offline(course.is_offline() || lessons.is_offline()),
        course_id,
        course_title: course.value.title.clone(),
        percent: progress.percent_complete(&outline),
        course_complete: progress.course_complete(&outline),
        lessons: lesson_nav(course_id, &lessons.value, &outline, &progress, current),
        current: current.and_then(|at| current_page(course_id, &lessons.value, &outline, &progress, at)),
    };
    Ok(template.into_response())
}

/// Mark the shown page complete and move on.
#[instrument(skip(state, session))]
pub async fn complete(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
    session: Session,
    Form(form): Form<CompleteForm>,
) -> Result<Response> {
    if let Some(redirect) = require_purchase(&session, course_id).await? {
        return Ok(redirect);
    }

    let lessons = Catalog::from_state(&state).lessons(course_id).await;
    let outline = CourseOutline::from_lessons(&lessons.value);
    let token = optional_token(&state, &session).await;
    let at = PageRef::new(form.lesson_id, form.page);

    let next = progress::complete(state.api(), &session, token.as_deref(), course_id, &outline, at).await?;
    add_breadcrumb(
        "learn",
        "Completed page",
        Some(&[
            ("course_id", course_id.to_string().as_str()),
            ("lesson_id", form.lesson_id.to_string().as_str()),
        ]),
    );

    let target = match next {
        Some(next) => page_href(course_id, next),
        None => {
            flash::set(&session, Flash::success("Course complete. Great work!")).await?;
            page_href(course_id, at)
        }
    };
    Ok(Redirect::to(&target).into_response())
}

// =============================================================================
// View builders
// =============================================================================

fn lesson_nav(
    course_id: CourseId,
    lessons: &[Lesson],
    outline: &CourseOutline,
    progress: &CourseProgress,
    current: Option<PageRef>,
) -> Vec<LessonNavView> {
    lessons
        .iter()
        .map(|lesson| {
            let count = outline.pages_in(lesson.id).unwrap_or(0);
            let pages = (0..count)
                .map(|page| {
                    let at = PageRef::new(lesson.id, page);
                    let state = progress.page_state(outline, at).unwrap_or(PageState::Locked);
                    PageLinkView {
                        number: page + 1,
                        href: page_href(course_id, at),
                        completed: state == PageState::Completed,
                        locked: state == PageState::Locked,
                        current: current == Some(at),
                    }
                })
                .collect();
            LessonNavView {
                title: lesson.title.clone(),
                completed: progress.lesson_complete(outline, lesson.id),
                pages,
            }
        })
        .collect()
}

/// Hosts whose players must be framed rather than played with `<video>`.
fn is_embedded_player(url: &str) -> bool {
    url.starts_with("https://www.youtube-nocookie.com/") || url.starts_with("https://player.vimeo.com/")
}

fn current_page(
    course_id: CourseId,
    lessons: &[Lesson],
    outline: &CourseOutline,
    progress: &CourseProgress,
    at: PageRef,
) -> Option<CurrentPageView> {
    let lesson = lessons.iter().find(|l| l.id == at.lesson_id)?;
    let content = lesson.pages.get(usize::try_from(at.page).ok()?);
    let completed = progress.is_completed(at);
    let next = outline.ordinal(at).and_then(|ordinal| outline.at(ordinal + 1));

    Some(CurrentPageView {
        lesson_id: lesson.id,
        lesson_title: lesson.title.clone(),
        video_url: lesson.video_url.clone(),
        video_embed: lesson.video_url.as_deref().is_some_and(is_embedded_player),
        page: at.page,
        page_number: at.page + 1,
        page_count: outline.pages_in(lesson.id).unwrap_or(1),
        title: content.map(|p| p.title.clone()),
        body: content.map(|p| p.body.clone()).unwrap_or_default(),
        completed,
        next_href: next.filter(|_| completed).map(|n| page_href(course_id, n)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_player_hosts() {
        assert!(is_embedded_player("https://player.vimeo.com/video/76979871"));
        assert!(is_embedded_player("https://www.youtube-nocookie.com/embed/abc"));
        assert!(!is_embedded_player("https://media.ringside.academy/fundamentals/stance.mp4"));
    }

    fn lesson(id: i32, position: u32, pages: usize) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            course_id: CourseId::new(1),
            position,
            title: format!("Lesson {id}"),
            video_url: None,
            duration_minutes: 10,
            pages: (0..pages)
                .map(|i| ringside_core::LessonPage {
                    title: format!("Page {i}"),
                    body: "Keep your hands up.".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_nav_marks_locked_and_current_pages() {
        let lessons = vec![lesson(1, 1, 2), lesson(2, 2, 1)];
        let outline = CourseOutline::from_lessons(&lessons);
        let mut progress = CourseProgress::new();
        progress
            .complete(&outline, PageRef::new(LessonId::new(1), 0))
            .unwrap();

        let current = Some(PageRef::new(LessonId::new(1), 1));
        let nav = lesson_nav(CourseId::new(1), &lessons, &outline, &progress, current);

        assert_eq!(nav.len(), 2);
        assert!(nav[0].pages[0].completed);
        assert!(nav[0].pages[1].current);
        assert!(!nav[0].pages[1].locked);
        assert!(nav[1].pages[0].locked);
    }

    #[test]
    fn test_next_link_only_after_completion() {
        let lessons = vec![lesson(1, 1, 2)];
        let outline = CourseOutline::from_lessons(&lessons);
        let mut progress = CourseProgress::new();
        let first = PageRef::new(LessonId::new(1), 0);

        let view = current_page(CourseId::new(1), &lessons, &outline, &progress, first).unwrap();
        assert!(view.next_href.is_none());
        assert_eq!(view.title.as_deref(), Some("Page 0"));

        progress.complete(&outline, first).unwrap();
        let view = current_page(CourseId::new(1), &lessons, &outline, &progress, first).unwrap();
        assert_eq!(view.next_href.as_deref(), Some("/courses/1/learn?lesson=1&page=1"));
    }
}

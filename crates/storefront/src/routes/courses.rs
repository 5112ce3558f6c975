//! Course catalog, purchase and "my courses" handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use ringside_core::{Course, CourseId, CourseLevel, CourseOutline, Lesson};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::api::ApiError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::routes::format_price;
use crate::services::{
    AuthError, AuthService, Catalog, Flash, PurchaseOutcome, flash, progress, purchases,
};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Course summary for listings.
#[derive(Clone)]
pub struct CourseCardView {
    pub id: CourseId,
    pub title: String,
    pub summary: String,
    pub instructor: String,
    pub level: String,
    pub price: String,
    pub thumbnail_url: Option<String>,
    pub duration_minutes: u32,
    pub lesson_count: u32,
}

impl CourseCardView {
    #[must_use]
    pub fn new(course: &Course, state: &AppState) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            summary: course.summary.clone(),
            instructor: course.instructor.clone(),
            level: course.level.label().to_string(),
            price: format_price(state, course.price),
            thumbnail_url: course.thumbnail_url.clone(),
            duration_minutes: course.duration_minutes,
            lesson_count: course.lesson_count,
        }
    }
}

/// Lesson row on the course page.
#[derive(Clone)]
pub struct LessonRowView {
    pub id: String,
    pub position: u32,
    pub title: String,
    pub duration_minutes: u32,
    pub completed: bool,
}

/// Level filter option.
#[derive(Clone)]
pub struct LevelOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Owned course with progress.
#[derive(Clone)]
pub struct MyCourseView {
    pub card: CourseCardView,
    pub percent: u8,
    pub complete: bool,
    pub started: bool,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "courses/index.html")]
pub struct CoursesIndexTemplate {
    pub page: PageContext,
    pub courses: Vec<CourseCardView>,
    pub levels: Vec<LevelOption>,
}

#[derive(Template, WebTemplate)]
#[template(path = "courses/show.html")]
pub struct CourseShowTemplate {
    pub page: PageContext,
    pub course: CourseCardView,
    pub description: String,
    pub lessons: Vec<LessonRowView>,
    pub owned: bool,
    pub percent: u8,
}

#[derive(Template, WebTemplate)]
#[template(path = "courses/mine.html")]
pub struct MyCoursesTemplate {
    pub page: PageContext,
    pub courses: Vec<MyCourseView>,
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LevelQuery {
    pub level: Option<String>,
}

/// Course listing, optionally filtered by level.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<LevelQuery>,
    page: PageContext,
) -> impl IntoResponse {
    let level = query
        .level
        .as_deref()
        .and_then(|raw| raw.parse::<CourseLevel>().ok());

    let courses = Catalog::from_state(&state).courses().await;
    let offline = courses.is_offline();

    let courses = courses
        .value
        .iter()
        .filter(|c| level.is_none_or(|l| c.level == l))
        .map(|c| CourseCardView::new(c, &state))
        .collect();

    let levels = CourseLevel::ALL
        .iter()
        .map(|l| LevelOption {
            value: l.as_str(),
            label: l.label(),
            selected: level == Some(*l),
        })
        .collect();

    CoursesIndexTemplate {
        page: page.with_offline(offline),
        courses,
        levels,
    }
}

/// Course detail page.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
    session: Session,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let catalog = Catalog::from_state(&state);
    let course = catalog
        .course(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("course {id}")))?;
    let lessons = catalog.lessons(id).await;

    let owned = purchases::owns(&session, id).await;
    let progress = progress::load(&session).await.course(id);
    let outline = CourseOutline::from_lessons(&lessons.value);

    let rows = lessons
        .value
        .iter()
        .map(|lesson| LessonRowView {
            id: lesson.id.to_string(),
            position: lesson.position,
            title: lesson.title.clone(),
            duration_minutes: lesson.duration_minutes,
            completed: progress.lesson_complete(&outline, lesson.id),
        })
        .collect();

    Ok(CourseShowTemplate {
        page: page.with_offline(course.is_offline() || lessons.is_offline()),
        course: CourseCardView::new(&course.value, &state),
        description: course.value.description.clone(),
        lessons: rows,
        owned,
        percent: if owned { progress.percent_complete(&outline) } else { 0 },
    })
}

/// Buy a course, then open the player.
#[instrument(skip(state, session, _user))]
pub async fn purchase(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
    session: Session,
    RequireAuth(_user): RequireAuth,
) -> Result<Response> {
    let course_url = format!("/courses/{id}");

    if Catalog::from_state(&state).course(id).await.is_none() {
        return Err(AppError::NotFound(format!("course {id}")));
    }

    let token = match AuthService::new(state.api()).require_token(&session).await {
        Ok(token) => token,
        Err(AuthError::SessionExpired) => return Ok(session_expired(&session, &course_url).await),
        Err(e) => return Err(e.into()),
    };

    let notice = match purchases::purchase_course(state.api(), &session, &token, id).await {
        Ok(PurchaseOutcome::Purchased { .. }) => Flash::success("You're in. Let's get to work."),
        Ok(PurchaseOutcome::AlreadyOwned) => Flash::info("You already own this course."),
        Ok(PurchaseOutcome::RecordedOffline) => {
            Flash::info("Payments are offline, so this course was unlocked in demo mode.")
        }
        Err(AppError::Api(ApiError::Unauthorized)) => {
            return Ok(session_expired(&session, &course_url).await);
        }
        Err(AppError::Api(e)) if e.user_message().is_some() => {
            let message = e.user_message().unwrap_or_default().to_string();
            flash::set(&session, Flash::error(message)).await?;
            return Ok(Redirect::to(&course_url).into_response());
        }
        Err(e) => return Err(e),
    };

    flash::set(&session, notice).await?;
    Ok(Redirect::to(&format!("/courses/{id}/learn")).into_response())
}

/// Sign the visitor out and send them to the login page, coming back to `return_to`.
async fn session_expired(session: &Session, return_to: &str) -> Response {
    if let Err(e) = AuthService::logout(session).await {
        warn!(error = %e, "Failed to clear expired session");
    }
    if let Err(e) = session
        .insert(crate::models::session_keys::RETURN_TO, return_to)
        .await
    {
        warn!(error = %e, "Failed to remember return path");
    }
    if let Err(e) = flash::set(session, Flash::info("Your session expired, please sign in again.")).await {
        warn!(error = %e, "Failed to set flash");
    }
    Redirect::to("/auth/login").into_response()
}

/// Purchased courses with progress.
#[instrument(skip(state, session, page, _user))]
pub async fn my_courses(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    page: PageContext,
) -> impl IntoResponse {
    let catalog = Catalog::from_state(&state);
    let owned = purchases::load(&session).await;
    let book = progress::load(&session).await;
    let courses = catalog.courses().await;
    let mut offline = courses.is_offline();

    let mut views = Vec::new();
    for course in courses.value.iter().filter(|c| owned.contains(c.id)) {
        let lessons = catalog.lessons(course.id).await;
        offline |= lessons.is_offline();
        views.push(my_course_view(course, &lessons.value, &book.course(course.id), &state));
    }

    MyCoursesTemplate {
        page: page.with_offline(offline),
        courses: views,
    }
}

fn my_course_view(
    course: &Course,
    lessons: &[Lesson],
    progress: &ringside_core::CourseProgress,
    state: &AppState,
) -> MyCourseView {
    let outline = CourseOutline::from_lessons(lessons);
    MyCourseView {
        card: CourseCardView::new(course, state),
        percent: progress.percent_complete(&outline),
        complete: progress.course_complete(&outline),
        started: progress.completed().next().is_some(),
    }
}

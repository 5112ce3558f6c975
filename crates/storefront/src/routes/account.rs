//! Account route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::session_keys;
use crate::routes::courses::CourseCardView;
use crate::services::{AuthError, AuthService, Catalog, Flash, flash, purchases};
use crate::state::AppState;

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
    pub courses: Vec<CourseCardView>,
    /// Profile could not be refreshed; showing the session copy.
    pub stale: bool,
}

/// Display the account overview.
#[instrument(skip(state, session, page, current_user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current_user): RequireAuth,
    page: PageContext,
) -> Result<Response> {
    let (name, email, stale) = match AuthService::new(state.api()).refresh_profile(&session).await {
        Ok(Some(profile)) => (profile.display_name().to_string(), profile.email.to_string(), false),
        Ok(None) => (current_user.display_name, current_user.email.to_string(), true),
        Err(AuthError::SessionExpired) => {
            session
                .insert(session_keys::RETURN_TO, "/account")
                .await?;
            flash::set(&session, Flash::info("Your session expired, please sign in again.")).await?;
            return Ok(Redirect::to("/auth/login").into_response());
        }
        Err(e) => {
            warn!(error = %e, "Profile refresh failed, showing cached profile");
            (current_user.display_name, current_user.email.to_string(), true)
        }
    };

    let owned = purchases::load(&session).await;
    let courses = Catalog::from_state(&state).courses().await;
    let offline = courses.is_offline();
    let courses = courses
        .value
        .iter()
        .filter(|c| owned.contains(c.id))
        .map(|c| CourseCardView::new(c, &state))
        .collect();

    Ok(AccountIndexTemplate {
        page: page.with_offline(offline),
        name,
        email,
        courses,
        stale,
    }
    .into_response())
}

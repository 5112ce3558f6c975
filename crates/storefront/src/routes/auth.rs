//! Authentication route handlers.
//!
//! Handles login, registration and logout against the backend accounts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, take_return_to};
use crate::services::{AuthError, AuthService, Flash, flash};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

fn error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::Backend(_) | AuthError::Session(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Where to go after signing in.
async fn after_sign_in(session: &Session, greeting: String) -> Result<Response> {
    let target = take_return_to(session).await.unwrap_or_else(|| "/my-courses".to_string());
    flash::set(session, Flash::success(greeting)).await?;
    Ok(Redirect::to(&target).into_response())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext) -> Response {
    if page.signed_in() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        page,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.api())
        .login(&session, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            add_breadcrumb("auth", "Signed in", None);
            after_sign_in(&session, format!("Welcome back, {}.", user.display_name)).await
        }
        Err(e) => {
            if matches!(e, AuthError::Backend(_) | AuthError::Session(_)) {
                warn!(error = %e, "Login failed");
            }
            let status = error_status(&e);
            Ok((
                status,
                LoginTemplate {
                    page,
                    email: form.email,
                    error: Some(e.user_message()),
                },
            )
                .into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: PageContext) -> Response {
    if page.signed_in() {
        return Redirect::to("/account").into_response();
    }
    RegisterTemplate {
        page,
        name: String::new(),
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, page, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    match AuthService::new(state.api())
        .register(
            &session,
            &form.name,
            &form.email,
            &form.password,
            &form.password_confirm,
        )
        .await
    {
        Ok(user) => {
            add_breadcrumb("auth", "Registered", None);
            after_sign_in(&session, format!("Welcome to Ringside, {}.", user.display_name)).await
        }
        Err(e) => {
            if matches!(e, AuthError::Backend(_) | AuthError::Session(_)) {
                warn!(error = %e, "Registration failed");
            }
            let status = error_status(&e);
            Ok((
                status,
                RegisterTemplate {
                    page,
                    name: form.name,
                    email: form.email,
                    error: Some(e.user_message()),
                },
            )
                .into_response())
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout. The cart is kept.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    AuthService::logout(&session).await?;
    flash::set(&session, Flash::info("You have been signed out.")).await?;
    Ok(Redirect::to("/"))
}

//! Mock checkout handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::models::LastOrder;
use crate::routes::cart::CartView;
use crate::services::checkout::{self, FieldError};
use crate::services::{AuthService, CheckoutError, CheckoutForm, Flash, cart, flash};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub errors: Vec<FieldError>,
    pub error: Option<String>,
}

impl CheckoutTemplate {
    /// Message for a field, if it failed validation.
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: PageContext,
    pub order: LastOrder,
}

async fn redirect_empty_cart(session: &Session) -> Result<Response> {
    flash::set(session, Flash::info("Your cart is empty.")).await?;
    Ok(Redirect::to("/cart").into_response())
}

/// Show the checkout form.
#[instrument(skip(state, session, page))]
pub async fn show(State(state): State<AppState>, session: Session, page: PageContext) -> Result<Response> {
    let basket = cart::load(&session).await;
    if basket.is_empty() {
        return redirect_empty_cart(&session).await;
    }

    let form = CheckoutForm {
        email: page
            .user
            .as_ref()
            .map(|u| u.email.to_string())
            .unwrap_or_default(),
        name: page.user.as_ref().map(|u| u.display_name.clone()).unwrap_or_default(),
        ..CheckoutForm::default()
    };

    Ok(CheckoutTemplate {
        page,
        cart: CartView::new(&basket, &state),
        form,
        errors: Vec::new(),
        error: None,
    }
    .into_response())
}

/// Validate the form and place the order.
#[instrument(skip(state, session, page, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let basket = cart::load(&session).await;
    if basket.is_empty() {
        return redirect_empty_cart(&session).await;
    }

    let rerender = |errors: Vec<FieldError>, error: Option<String>| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            CheckoutTemplate {
                page: page.clone(),
                cart: CartView::new(&basket, &state),
                form: form.without_card(),
                errors,
                error,
            },
        )
            .into_response()
    };

    let validated = match checkout::validate(&form, Utc::now().date_naive()) {
        Ok(validated) => validated,
        Err(errors) => return Ok(rerender(errors, None)),
    };

    let token = match AuthService::new(state.api()).access_token(&session).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Checking out as guest");
            None
        }
    };

    let config = state.config();
    match checkout::place_order(
        state.api(),
        &session,
        token.as_deref(),
        validated,
        &config.shop.shipping,
        config.shop.currency,
    )
    .await
    {
        Ok(_) => Ok(Redirect::to("/checkout/complete").into_response()),
        Err(CheckoutError::EmptyCart) => redirect_empty_cart(&session).await,
        Err(CheckoutError::Invalid(errors)) => Ok(rerender(errors, None)),
        Err(CheckoutError::Rejected(message)) => Ok(rerender(Vec::new(), Some(message))),
        Err(CheckoutError::Session(e)) => Err(e.into()),
    }
}

/// Order confirmation.
#[instrument(skip(session, page))]
pub async fn complete(session: Session, page: PageContext) -> Response {
    match checkout::last_order(&session).await {
        Some(order) => ConfirmationTemplate { page, order }.into_response(),
        None => Redirect::to("/").into_response(),
    }
}

//! Cart route handlers.
//!
//! Plain form posts that redirect back to a page (post/redirect/get). The
//! cart itself lives in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use ringside_core::{CartAction, CartError, CartItem, CartLineKey, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::PageContext;
use crate::routes::format_price;
use crate::services::{Catalog, Flash, cart, flash};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub item_count: u32,
    /// Amount still needed for free shipping, if any.
    pub free_shipping_gap: Option<String>,
}

impl CartView {
    #[must_use]
    pub fn new(basket: &ringside_core::Cart, state: &AppState) -> Self {
        let policy = &state.config().shop.shipping;
        let totals = basket.totals(policy);
        Self {
            items: basket
                .items()
                .iter()
                .map(|item| CartItemView {
                    product_id: item.product_id,
                    name: item.name.clone(),
                    size: item.size.clone(),
                    color: item.color.clone(),
                    quantity: item.quantity,
                    price: format_price(state, item.unit_price),
                    line_price: format_price(state, item.line_total()),
                    image_url: item.image_url.clone(),
                })
                .collect(),
            subtotal: format_price(state, totals.subtotal),
            shipping: format_price(state, totals.shipping),
            total: format_price(state, totals.total),
            item_count: totals.item_count,
            free_shipping_gap: if basket.is_empty() {
                None
            } else {
                policy
                    .remaining_for_free(totals.subtotal)
                    .map(|gap| format_price(state, gap))
            },
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

// =============================================================================
// Forms
// =============================================================================

/// Empty select values mean "no option".
fn option(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

const fn default_quantity() -> u32 {
    1
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Identifies a cart line in update and remove forms.
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub quantity: u32,
}

impl LineForm {
    fn key(&self) -> CartLineKey {
        CartLineKey::new(self.product_id, option(self.size.clone()), option(self.color.clone()))
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, session, page))]
pub async fn show(State(state): State<AppState>, session: Session, page: PageContext) -> impl IntoResponse {
    let basket = cart::load(&session).await;
    CartShowTemplate {
        page,
        cart: CartView::new(&basket, &state),
    }
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = Catalog::from_state(&state)
        .product(form.product_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("product {}", form.product_id)))?
        .value;
    let product_url = format!("/shop/{}", product.id);

    let size = option(form.size);
    let color = option(form.color);

    let problem = if !product.in_stock {
        Some(format!("{} is out of stock.", product.name))
    } else if !product.accepts_size(size.as_deref()) {
        Some("Please choose a size.".to_string())
    } else if !product.accepts_color(color.as_deref()) {
        Some("Please choose a color.".to_string())
    } else {
        None
    };
    if let Some(message) = problem {
        flash::set(&session, Flash::error(message)).await?;
        return Ok(Redirect::to(&product_url).into_response());
    }

    let item = CartItem {
        product_id: product.id,
        name: product.name.clone(),
        unit_price: product.price,
        image_url: product.image_url.clone(),
        size,
        color,
        quantity: form.quantity,
        added_at: Utc::now(),
    };

    match cart::dispatch(&session, CartAction::Add(item)).await {
        Ok(_) => {
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", product.id.to_string().as_str())]),
            );
            flash::set(&session, Flash::success(format!("Added {} to your cart.", product.name))).await?;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(AppError::Cart(e)) => {
            flash::set(&session, Flash::error(cart_message(&e))).await?;
            Ok(Redirect::to(&product_url).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Change a line's quantity; zero removes it.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<LineForm>) -> Result<Redirect> {
    let action = CartAction::SetQuantity {
        key: form.key(),
        quantity: form.quantity,
    };
    apply(&session, action, "Cart updated.").await
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<LineForm>) -> Result<Redirect> {
    apply(&session, CartAction::Remove { key: form.key() }, "Item removed.").await
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect> {
    apply(&session, CartAction::Clear, "Cart cleared.").await
}

/// Cart badge count as plain text.
pub async fn count(session: Session) -> String {
    cart::count(&session).await.to_string()
}

async fn apply(session: &Session, action: CartAction, success: &str) -> Result<Redirect> {
    let notice = match cart::dispatch(session, action).await {
        Ok(_) => Flash::success(success),
        Err(AppError::Cart(e)) => Flash::error(cart_message(&e)),
        Err(e) => return Err(e),
    };
    flash::set(session, notice).await?;
    Ok(Redirect::to("/cart"))
}

fn cart_message(err: &CartError) -> String {
    match err {
        CartError::InvalidQuantity => "Quantity must be at least 1.".to_string(),
        CartError::QuantityLimit { max } => format!("You can order at most {max} of one item."),
        CartError::ItemNotFound => "That item is no longer in your cart.".to_string(),
    }
}

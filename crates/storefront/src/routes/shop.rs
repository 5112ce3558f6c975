//! Merch shop handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use ringside_core::{Product, ProductId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::routes::format_price;
use crate::services::Catalog;
use crate::state::AppState;

/// Product summary for listings.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: String,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, state: &AppState) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            price: format_price(state, product.price),
            image_url: product.image_url.clone(),
            in_stock: product.in_stock,
        }
    }
}

/// Category filter option.
#[derive(Clone)]
pub struct CategoryOption {
    pub name: String,
    pub selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCardView>,
    pub categories: Vec<CategoryOption>,
    pub all_selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductCardView,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

/// Distinct categories in first-seen order.
fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        if !seen.iter().any(|c| c.eq_ignore_ascii_case(&product.category)) {
            seen.push(product.category.clone());
        }
    }
    seen
}

/// Product listing, optionally filtered by category.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
    page: PageContext,
) -> impl IntoResponse {
    let products = Catalog::from_state(&state).products().await;
    let selected = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let listing = products
        .value
        .iter()
        .filter(|p| selected.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
        .map(|p| ProductCardView::new(p, &state))
        .collect();

    let categories = categories(&products.value)
        .into_iter()
        .map(|name| CategoryOption {
            selected: selected.is_some_and(|c| c.eq_ignore_ascii_case(&name)),
            name,
        })
        .collect();

    ShopIndexTemplate {
        page: page.with_offline(products.is_offline()),
        products: listing,
        categories,
        all_selected: selected.is_none(),
    }
}

/// Product detail with option pickers.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let product = Catalog::from_state(&state)
        .product(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductShowTemplate {
        page: page.with_offline(product.is_offline()),
        product: ProductCardView::new(&product.value, &state),
        description: product.value.description.clone(),
        sizes: product.value.sizes.clone(),
        colors: product.value.colors.clone(),
    })
}

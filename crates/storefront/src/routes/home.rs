//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::PageContext;
use crate::routes::courses::CourseCardView;
use crate::routes::shop::ProductCardView;
use crate::services::Catalog;
use crate::state::AppState;

/// Courses shown on the home page.
const FEATURED_COURSES: usize = 3;

/// Products shown on the home page.
const FEATURED_PRODUCTS: usize = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub courses: Vec<CourseCardView>,
    pub products: Vec<ProductCardView>,
}

/// Display the home page.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let catalog = Catalog::from_state(&state);
    let (courses, products) = tokio::join!(catalog.courses(), catalog.products());
    let offline = courses.is_offline() || products.is_offline();

    HomeTemplate {
        page: page.with_offline(offline),
        courses: courses
            .value
            .iter()
            .take(FEATURED_COURSES)
            .map(|c| CourseCardView::new(c, &state))
            .collect(),
        products: products
            .value
            .iter()
            .take(FEATURED_PRODUCTS)
            .map(|p| ProductCardView::new(p, &state))
            .collect(),
    }
}

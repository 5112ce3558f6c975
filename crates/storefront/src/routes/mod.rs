//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page
//! GET  /health                   - Liveness
//! GET  /health/ready             - Readiness (backend reachable)
//!
//! # Courses
//! GET  /courses[?level=]         - Course listing
//! GET  /courses/{id}             - Course detail
//! POST /courses/{id}/purchase    - Buy a course (auth required)
//! GET  /courses/{id}/learn       - Lesson player (?lesson=&page=)
//! POST /courses/{id}/learn/complete - Mark a page complete
//! GET  /my-courses               - Purchased courses with progress (auth required)
//!
//! # Shop
//! GET  /shop[?category=]         - Product listing
//! GET  /shop/{id}                - Product detail
//!
//! # Cart
//! GET  /cart                     - Cart page
//! POST /cart/add                 - Add to cart
//! POST /cart/update              - Set quantity (0 removes)
//! POST /cart/remove              - Remove line
//! POST /cart/clear               - Empty cart
//! GET  /cart/count               - Cart count badge (plain text)
//!
//! # Checkout
//! GET  /checkout                 - Mock checkout form
//! POST /checkout                 - Place order
//! GET  /checkout/complete        - Confirmation
//!
//! # Auth
//! GET  /auth/login               - Login page
//! POST /auth/login               - Login action (rate limited)
//! GET  /auth/register            - Register page
//! POST /auth/register            - Register action (rate limited)
//! POST /auth/logout              - Logout action
//!
//! # Account (requires auth)
//! GET  /account                  - Account overview
//!
//! # Chat
//! GET  /chat                     - Conversation
//! POST /chat                     - Send message (rate limited)
//! POST /chat/reset               - New conversation
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod courses;
pub mod health;
pub mod home;
pub mod learn;
pub mod shop;

use axum::{
    Router,
    routing::{get, post},
};
use ringside_core::Price;
use rust_decimal::Decimal;

use crate::middleware::{ClientIpKeyExtractor, auth_rate_limiter, chat_rate_limiter};
use crate::state::AppState;

/// Format an amount in the shop currency.
pub(crate) fn format_price(state: &AppState, amount: Decimal) -> String {
    Price::new(amount, state.config().shop.currency).display()
}

/// Create the course routes router.
pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(courses::index))
        .route("/{id}", get(courses::show))
        .route("/{id}/purchase", post(courses::purchase))
        .route("/{id}/learn", get(learn::player))
        .route("/{id}/learn/complete", post(learn::complete))
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::index))
        .route("/{id}", get(shop::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/complete", get(checkout::complete))
}

/// Create the auth routes router. Form submissions are rate limited.
pub fn auth_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            post(auth::login).layer(auth_rate_limiter(client_ip)).get(auth::login_page),
        )
        .route(
            "/register",
            post(auth::register).layer(auth_rate_limiter(client_ip)).get(auth::register_page),
        )
        .route("/logout", post(auth::logout))
}

/// Create the chat routes router.
pub fn chat_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/", post(chat::send).layer(chat_rate_limiter(client_ip)).get(chat::index))
        .route("/reset", post(chat::reset))
}

/// Create all routes for the storefront.
///
/// `client_ip` decides how rate-limited routes identify a visitor.
pub fn routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/courses", course_routes())
        .route("/my-courses", get(courses::my_courses))
        .nest("/shop", shop_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes(client_ip))
        .route("/account", get(account::index))
        .nest("/chat", chat_routes(client_ip))
}

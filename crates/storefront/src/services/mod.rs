//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in against the backend, token storage and refresh
//! - `catalog` - Courses, lessons and products with bundled fallback
//! - `cart` - Cart store persisted in the session
//! - `chat` - AI coach conversation
//! - `checkout` - Mock checkout validation and order submission
//! - `flash` - One-shot notices between requests
//! - `progress` - Lesson progress per course
//! - `purchases` - Purchased course set and course purchase

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod flash;
pub mod progress;
pub mod purchases;

pub use auth::{AuthError, AuthService};
pub use catalog::{Catalog, DataSource, Loaded};
pub use chat::ChatError;
pub use checkout::{CheckoutError, CheckoutForm};
pub use flash::{Flash, FlashLevel};
pub use purchases::PurchaseOutcome;

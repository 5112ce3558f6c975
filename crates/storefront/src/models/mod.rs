//! Session-backed models for the storefront.

pub mod session;

pub use session::{AuthTokens, CurrentUser, LastOrder, keys as session_keys};

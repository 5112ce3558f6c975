//! Session-persisted cart.

use ringside_core::{Cart, CartAction};
use tower_sessions::Session;
use tracing::warn;

use crate::error::AppError;
use crate::models::session_keys;

/// Load the visitor's cart. A missing or unreadable value is an empty cart.
pub async fn load(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Discarding unreadable cart");
            Cart::new()
        }
    }
}

/// Persist the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Apply one action to the stored cart and persist the result.
///
/// The stored cart is left untouched when the action is rejected.
///
/// # Errors
///
/// Returns [`AppError::Cart`] if the action is invalid, or
/// [`AppError::Session`] if the session cannot be written.
pub async fn dispatch(session: &Session, action: CartAction) -> Result<Cart, AppError> {
    let mut cart = load(session).await;
    cart.apply(action)?;
    save(session, &cart).await?;
    Ok(cart)
}

/// Number of units in the cart, for the header badge.
pub async fn count(session: &Session) -> u32 {
    load(session).await.item_count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use ringside_core::{CartError, CartItem, ProductId};
    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn wraps(quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(2),
            name: "Hand Wraps".to_string(),
            unit_price: Decimal::new(999, 2),
            image_url: None,
            size: None,
            color: Some("black".to_string()),
            quantity,
            added_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_persists_cart() {
        let session = session();
        dispatch(&session, CartAction::Add(wraps(2))).await.unwrap();
        dispatch(&session, CartAction::Add(wraps(1))).await.unwrap();

        let cart = load(&session).await;
        assert_eq!(cart.items().len(), 1);
        assert_eq!(count(&session).await, 3);
    }

    #[tokio::test]
    async fn test_rejected_action_leaves_cart_unchanged() {
        let session = session();
        dispatch(&session, CartAction::Add(wraps(1))).await.unwrap();

        let err = dispatch(&session, CartAction::Add(wraps(0))).await.unwrap_err();
        assert!(matches!(err, AppError::Cart(CartError::InvalidQuantity)));
        assert_eq!(count(&session).await, 1);
    }

    #[tokio::test]
    async fn test_unreadable_cart_is_empty() {
        let session = session();
        session.insert(session_keys::CART, "not a cart").await.unwrap();
        assert!(load(&session).await.is_empty());
    }
}

//! Reducer-style shopping cart store.
//!
//! The cart is a flat list of lines. Every mutation goes through
//! [`Cart::apply`] so the invariants hold after any sequence of actions:
//!
//! - each line has a quantity in `1..=MAX_LINE_QUANTITY`
//! - no two lines share a [`CartLineKey`] (product, size, color)
//! - a rejected action leaves the cart untouched

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProductId;

/// Largest quantity a single line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors returned when an action would break a cart invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("a line may hold at most {max} items")]
    QuantityLimit { max: u32 },
    #[error("item is not in the cart")]
    ItemNotFound,
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartLineKey {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl CartLineKey {
    #[must_use]
    pub const fn new(product_id: ProductId, size: Option<String>, color: Option<String>) -> Self {
        Self {
            product_id,
            size,
            color,
        }
    }
}

/// One line in the cart.
///
/// Name, price and image are snapshotted at insertion so the cart renders
/// without a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// The key this line is deduplicated on.
    #[must_use]
    pub fn key(&self) -> CartLineKey {
        CartLineKey::new(self.product_id, self.size.clone(), self.color.clone())
    }

    fn matches(&self, key: &CartLineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Mutations accepted by [`Cart::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add an item, merging with an existing line of the same key.
    Add(CartItem),
    /// Set a line's quantity; zero removes the line.
    SetQuantity { key: CartLineKey, quantity: u32 },
    /// Remove a line.
    Remove { key: CartLineKey },
    /// Empty the cart.
    Clear,
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by key.
    #[must_use]
    pub fn get(&self, key: &CartLineKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.matches(key))
    }

    /// Apply an action.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the action would violate an invariant; the
    /// cart is unchanged in that case.
    pub fn apply(&mut self, action: CartAction) -> Result<(), CartError> {
        match action {
            CartAction::Add(item) => self.add(item),
            CartAction::SetQuantity { key, quantity } => self.set_quantity(&key, quantity),
            CartAction::Remove { key } => {
                let index = self.position(&key).ok_or(CartError::ItemNotFound)?;
                self.items.remove(index);
                Ok(())
            }
            CartAction::Clear => {
                self.items.clear();
                Ok(())
            }
        }
    }

    fn position(&self, key: &CartLineKey) -> Option<usize> {
        self.items.iter().position(|item| item.matches(key))
    }

    fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let key = item.key();
        if let Some(existing) = self.items.iter_mut().find(|line| line.matches(&key)) {
            let merged = existing.quantity.saturating_add(item.quantity);
            if merged > MAX_LINE_QUANTITY {
                return Err(CartError::QuantityLimit {
                    max: MAX_LINE_QUANTITY,
                });
            }
            existing.quantity = merged;
            return Ok(());
        }

        if item.quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityLimit {
                max: MAX_LINE_QUANTITY,
            });
        }
        self.items.push(item);
        Ok(())
    }

    fn set_quantity(&mut self, key: &CartLineKey, quantity: u32) -> Result<(), CartError> {
        let index = self.position(key).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 {
            self.items.remove(index);
            return Ok(());
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityLimit {
                max: MAX_LINE_QUANTITY,
            });
        }
        if let Some(line) = self.items.get_mut(index) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Subtotal, shipping and grand total under `policy`.
    #[must_use]
    pub fn totals(&self, policy: &ShippingPolicy) -> CartTotals {
        let subtotal = self.subtotal();
        let shipping = policy.shipping_for(self.is_empty(), subtotal);
        CartTotals {
            subtotal,
            shipping,
            total: subtotal + shipping,
            item_count: self.item_count(),
        }
    }
}

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub flat_rate: Decimal,
    pub free_over: Decimal,
}

impl ShippingPolicy {
    /// Shipping charge for a cart with the given subtotal.
    #[must_use]
    pub fn shipping_for(&self, empty: bool, subtotal: Decimal) -> Decimal {
        if empty || subtotal >= self.free_over {
            Decimal::ZERO
        } else {
            self.flat_rate
        }
    }

    /// How much more the visitor must spend for free shipping.
    #[must_use]
    pub fn remaining_for_free(&self, subtotal: Decimal) -> Option<Decimal> {
        (subtotal < self.free_over).then(|| self.free_over - subtotal)
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_rate: Decimal::new(799, 2),
            free_over: Decimal::new(7500, 2),
        }
    }
}

/// Computed cart figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub item_count: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, size: Option<&str>, price_cents: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Item {id}"),
            unit_price: Decimal::new(price_cents, 2),
            image_url: None,
            size: size.map(String::from),
            color: None,
            quantity,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_merges_same_key() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(item(1, Some("M"), 2500, 1))).unwrap();
        cart.apply(CartAction::Add(item(1, Some("M"), 2500, 2))).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_keeps_first_insertion_timestamp() {
        let mut cart = Cart::new();
        let first = item(1, None, 1000, 1);
        let added_at = first.added_at;
        cart.apply(CartAction::Add(first)).unwrap();

        let mut later = item(1, None, 1000, 1);
        later.added_at = added_at + chrono::Duration::minutes(5);
        cart.apply(CartAction::Add(later)).unwrap();

        assert_eq!(cart.items()[0].added_at, added_at);
    }

    #[test]
    fn test_add_distinguishes_size() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(item(1, Some("M"), 2500, 1))).unwrap();
        cart.apply(CartAction::Add(item(1, Some("L"), 2500, 1))).unwrap();

        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let mut cart = Cart::new();
        let err = cart.apply(CartAction::Add(item(1, None, 100, 0))).unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_past_limit_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(item(1, None, 100, 98))).unwrap();
        let err = cart.apply(CartAction::Add(item(1, None, 100, 2))).unwrap_err();

        assert_eq!(err, CartError::QuantityLimit { max: MAX_LINE_QUANTITY });
        assert_eq!(cart.item_count(), 98);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        let line = item(2, None, 100, 4);
        let key = line.key();
        cart.apply(CartAction::Add(line)).unwrap();
        cart.apply(CartAction::SetQuantity { key, quantity: 0 }).unwrap();

        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_and_remove_unknown_key() {
        let mut cart = Cart::new();
        let key = CartLineKey::new(ProductId::new(5), None, None);

        assert_eq!(
            cart.apply(CartAction::SetQuantity {
                key: key.clone(),
                quantity: 2
            }),
            Err(CartError::ItemNotFound)
        );
        assert_eq!(cart.apply(CartAction::Remove { key }), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_totals_sum_lines_and_apply_shipping() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(item(1, None, 2500, 2))).unwrap();
        cart.apply(CartAction::Add(item(2, None, 999, 1))).unwrap();

        let totals = cart.totals(&ShippingPolicy::default());
        assert_eq!(totals.subtotal, Decimal::new(5999, 2));
        assert_eq!(totals.shipping, Decimal::new(799, 2));
        assert_eq!(totals.total, Decimal::new(6798, 2));
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(item(1, None, 7500, 1))).unwrap();

        let policy = ShippingPolicy::default();
        assert_eq!(cart.totals(&policy).shipping, Decimal::ZERO);
        assert_eq!(policy.remaining_for_free(Decimal::new(7500, 2)), None);
        assert_eq!(
            policy.remaining_for_free(Decimal::new(5000, 2)),
            Some(Decimal::new(2500, 2))
        );
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let totals = Cart::new().totals(&ShippingPolicy::default());
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(item(1, None, 100, 1))).unwrap();
        cart.apply(CartAction::Clear).unwrap();
        assert!(cart.is_empty());
    }
}

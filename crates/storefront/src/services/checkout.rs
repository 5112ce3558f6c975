//! Mock checkout.
//!
//! The form collects card details so the flow looks real, but only the last
//! four digits ever leave this module and no payment is processed.

use chrono::{Datelike, NaiveDate};
use ringside_core::{Cart, CurrencyCode, Email, Price, ShippingPolicy};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::types::{OrderLine, OrderRequest, ShippingAddress};
use crate::api::{ApiClient, ApiError};
use crate::error::add_breadcrumb;
use crate::models::{LastOrder, session_keys};
use crate::services::cart;

/// Prefix of locally generated order numbers.
const OFFLINE_ORDER_PREFIX: &str = "RS-";

/// Errors that can occur while placing an order.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("please correct the highlighted fields")]
    Invalid(Vec<FieldError>),

    #[error("{0}")]
    Rejected(String),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// A validation failure tied to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Checkout form as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_expiry: String,
    #[serde(default)]
    pub card_cvc: String,
}

impl CheckoutForm {
    /// Copy of the form safe to render back: card fields are blanked.
    #[must_use]
    pub fn without_card(&self) -> Self {
        Self {
            card_number: String::new(),
            card_expiry: String::new(),
            card_cvc: String::new(),
            ..self.clone()
        }
    }
}

/// A form that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub email: Email,
    pub shipping_address: ShippingAddress,
    pub card_last4: String,
}

/// Validate the checkout form against `today`.
///
/// # Errors
///
/// Returns every failing field, in form order.
pub fn validate(form: &CheckoutForm, today: NaiveDate) -> Result<ValidatedCheckout, Vec<FieldError>> {
    let mut errors = Vec::new();

    let required = [
        ("name", &form.name, "Name is required"),
        ("address", &form.address, "Address is required"),
        ("city", &form.city, "City is required"),
        ("postal_code", &form.postal_code, "Postal code is required"),
        ("country", &form.country, "Country is required"),
    ];

    let email = match Email::parse(&form.email) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push(FieldError::new("email", "Enter a valid email address"));
            None
        }
    };

    for (field, value, message) in required {
        if value.trim().is_empty() {
            errors.push(FieldError::new(field, message));
        }
    }

    let digits: String = form.card_number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if !(13..=19).contains(&digits.len()) || !luhn_valid(&digits) {
        errors.push(FieldError::new("card_number", "Card number is invalid"));
    }

    match parse_expiry(&form.card_expiry) {
        Some((year, month)) if (year, month) >= (today.year(), today.month()) => {}
        Some(_) => errors.push(FieldError::new("card_expiry", "Card has expired")),
        None => errors.push(FieldError::new("card_expiry", "Use the format MM/YY")),
    }

    let cvc = form.card_cvc.trim();
    if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new("card_cvc", "CVC must be 3 or 4 digits"));
    }

    match email {
        Some(email) if errors.is_empty() => Ok(ValidatedCheckout {
            email,
            shipping_address: ShippingAddress {
                name: form.name.trim().to_string(),
                address: form.address.trim().to_string(),
                city: form.city.trim().to_string(),
                postal_code: form.postal_code.trim().to_string(),
                country: form.country.trim().to_string(),
            },
            card_last4: digits.chars().skip(digits.len().saturating_sub(4)).collect(),
        }),
        _ => Err(errors),
    }
}

/// Luhn checksum over an all-digit string.
fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

/// Parse `MM/YY` into `(year, month)`.
fn parse_expiry(raw: &str) -> Option<(i32, u32)> {
    let (month, year) = raw.trim().split_once('/')?;
    let (month, year) = (month.trim(), year.trim());
    if month.len() != 2 || year.len() != 2 {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    (1..=12).contains(&month).then_some((2000 + year, month))
}

/// Submit the order, clear the cart and remember the confirmation.
///
/// When the backend is unavailable a local order number is issued instead.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] for an empty cart,
/// [`CheckoutError::Rejected`] if the backend refuses the order, or
/// [`CheckoutError::Session`] if the session cannot be written.
pub async fn place_order(
    api: &ApiClient,
    session: &Session,
    token: Option<&str>,
    checkout: ValidatedCheckout,
    shipping: &ShippingPolicy,
    currency: CurrencyCode,
) -> Result<LastOrder, CheckoutError> {
    let basket = cart::load(session).await;
    if basket.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let totals = basket.totals(shipping);
    let email = checkout.email.as_str().to_string();
    let request = OrderRequest {
        email: email.clone(),
        items: order_lines(&basket),
        subtotal: totals.subtotal,
        shipping: totals.shipping,
        total: totals.total,
        currency,
        shipping_address: checkout.shipping_address,
        card_last4: checkout.card_last4,
    };

    let (order_number, offline) = match submit(api, token, &request).await {
        Ok(number) => (number, false),
        Err(e) if e.is_unavailable() => {
            warn!(error = %e, "Orders unavailable, issuing local order number");
            (offline_order_number(), true)
        }
        Err(e) => {
            return Err(CheckoutError::Rejected(
                e.user_message()
                    .unwrap_or("The order could not be placed")
                    .to_string(),
            ));
        }
    };

    cart::save(session, &Cart::new()).await?;

    let order = LastOrder {
        order_number,
        email,
        total: Price::new(totals.total, currency).display(),
        item_count: totals.item_count,
        offline,
    };
    session.insert(session_keys::LAST_ORDER, &order).await?;

    info!(order_number = %order.order_number, offline, "Order placed");
    add_breadcrumb("checkout", "Order placed", Some(&[("order_number", order.order_number.as_str())]));

    Ok(order)
}

/// Send the order; an expired token falls back to a guest order.
async fn submit(api: &ApiClient, token: Option<&str>, request: &OrderRequest) -> Result<String, ApiError> {
    let confirmation = match api.create_order(token, request).await {
        Err(ApiError::Unauthorized) if token.is_some() => api.create_order(None, request).await?,
        other => other?,
    };
    Ok(confirmation.order_number)
}

fn order_lines(basket: &Cart) -> Vec<OrderLine> {
    basket
        .items()
        .iter()
        .map(|item| OrderLine {
            product_id: item.product_id,
            name: item.name.clone(),
            size: item.size.clone(),
            color: item.color.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect()
}

fn offline_order_number() -> String {
    let id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{OFFLINE_ORDER_PREFIX}{}", id.to_uppercase())
}

/// The confirmation stored by the last successful checkout.
pub async fn last_order(session: &Session) -> Option<LastOrder> {
    session.get::<LastOrder>(session_keys::LAST_ORDER).await.ok().flatten()
}

//! Request and response bodies for the Ringside REST backend.

use ringside_core::{ChatTurn, CourseId, CurrencyCode, OrderId, PageRef, ProductId, UserProfile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `POST /auth/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/register`
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/refresh`
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Token pair issued by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    /// Some backends embed the profile to save a round trip.
    #[serde(default)]
    pub user: Option<UserProfile>,
}

const fn default_expires_in() -> i64 {
    3600
}

/// `GET /courses/{id}/progress`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressResponse {
    #[serde(default)]
    pub completed: Vec<PageRef>,
}

/// `POST /lessons/{id}/progress`
#[derive(Debug, Serialize)]
pub struct RecordProgressRequest {
    pub page: u32,
}

/// `POST /payments/courses`
#[derive(Debug, Serialize)]
pub struct PurchaseRequest {
    pub course_id: CourseId,
}

/// Result of a course purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseReceipt {
    pub course_id: CourseId,
    #[serde(default)]
    pub receipt_id: Option<String>,
}

/// A merch line in an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Where a merch order ships to.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// `POST /orders`
///
/// Only the last four card digits ever leave the storefront.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub email: String,
    pub items: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub shipping_address: ShippingAddress,
    pub card_last4: String,
}

/// Backend acknowledgement of an order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfirmation {
    #[serde(default)]
    pub id: Option<OrderId>,
    pub order_number: String,
}

/// `POST /ai/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatTurn],
}

/// The coach's reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(alias = "error", alias = "detail")]
    pub message: String,
}

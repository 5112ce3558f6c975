//! Ringside Core - Domain types and client-state rules.
//!
//! This crate provides the types shared by the Ringside storefront:
//! - catalog entities (courses, lessons, merchandise)
//! - the cart store and its invariants
//! - the lesson progress / page unlock state machine
//! - the purchased-course set
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no HTTP clients, no session access. The storefront owns persistence and
//! decides where each value lives.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, catalog and chat records
//! - [`cart`] - Reducer-style cart store
//! - [`progress`] - Page-based lesson progress
//! - [`purchases`] - Purchased course set

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod progress;
pub mod purchases;
pub mod types;

pub use cart::{Cart, CartAction, CartError, CartItem, CartLineKey, CartTotals, ShippingPolicy};
pub use progress::{CourseOutline, CourseProgress, PageRef, PageState, ProgressError};
pub use purchases::PurchasedCourses;
pub use types::*;

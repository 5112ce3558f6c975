//! Core types for Ringside.
//!
//! This module provides type-safe wrappers and plain records for the
//! catalog the storefront renders.

pub mod catalog;
pub mod chat;
pub mod email;
pub mod id;
pub mod price;

pub use catalog::{Course, CourseLevel, Lesson, LessonPage, Product, UserProfile};
pub use chat::{ChatRole, ChatTurn};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};

//! Cache types for backend catalog responses.

use ringside_core::{Course, CourseId, Lesson, Product, ProductId};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Courses,
    Course(CourseId),
    Lessons(CourseId),
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Courses(Vec<Course>),
    Course(Box<Course>),
    Lessons(Vec<Lesson>),
    Products(Vec<Product>),
    Product(Box<Product>),
}

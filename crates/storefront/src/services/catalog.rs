//! Catalog reads with bundled fallback.
//!
//! Every read goes to the backend first. If the backend fails for any reason
//! other than "this ID does not exist", the bundled catalog answers instead
//! and the result is tagged [`DataSource::Bundled`] so the page can say so.

use ringside_core::{Course, CourseId, Lesson, Product, ProductId};
use tracing::warn;

use crate::api::{ApiClient, ApiError};
use crate::fallback::BundledCatalog;
use crate::state::AppState;

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Bundled,
}

/// A value plus its source.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub source: DataSource,
}

impl<T> Loaded<T> {
    const fn live(value: T) -> Self {
        Self {
            value,
            source: DataSource::Live,
        }
    }

    const fn bundled(value: T) -> Self {
        Self {
            value,
            source: DataSource::Bundled,
        }
    }

    /// True when the value came from the bundled catalog.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.source == DataSource::Bundled
    }

    /// Transform the value, keeping the source.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loaded<U> {
        Loaded {
            value: f(self.value),
            source: self.source,
        }
    }
}

/// Catalog reader over the backend and the bundled data.
pub struct Catalog<'a> {
    api: &'a ApiClient,
    fallback: &'a BundledCatalog,
}

impl<'a> Catalog<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient, fallback: &'a BundledCatalog) -> Self {
        Self { api, fallback }
    }

    #[must_use]
    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(state.api(), state.fallback())
    }

    /// All courses.
    pub async fn courses(&self) -> Loaded<Vec<Course>> {
        match self.api.list_courses().await {
            Ok(courses) => Loaded::live(courses),
            Err(e) => {
                warn!(error = %e, "Course list unavailable, using bundled catalog");
                Loaded::bundled(self.fallback.courses().to_vec())
            }
        }
    }

    /// A single course, or `None` if it does not exist.
    pub async fn course(&self, id: CourseId) -> Option<Loaded<Course>> {
        match self.api.get_course(id).await {
            Ok(course) => Some(Loaded::live(course)),
            Err(ApiError::NotFound(_)) => None,
            Err(e) => {
                warn!(error = %e, course_id = %id, "Course unavailable, using bundled catalog");
                self.fallback.course(id).cloned().map(Loaded::bundled)
            }
        }
    }

    /// Lessons of a course, ordered by position.
    pub async fn lessons(&self, course_id: CourseId) -> Loaded<Vec<Lesson>> {
        let mut loaded = match self.api.list_lessons(course_id).await {
            Ok(lessons) => Loaded::live(lessons),
            Err(ApiError::NotFound(_)) => Loaded::live(Vec::new()),
            Err(e) => {
                warn!(error = %e, course_id = %course_id, "Lessons unavailable, using bundled catalog");
                Loaded::bundled(self.fallback.lessons(course_id))
            }
        };
        loaded.value.sort_by_key(|lesson| (lesson.position, lesson.id));
        loaded
    }

    /// All products.
    pub async fn products(&self) -> Loaded<Vec<Product>> {
        match self.api.list_products().await {
            Ok(products) => Loaded::live(products),
            Err(e) => {
                warn!(error = %e, "Product list unavailable, using bundled catalog");
                Loaded::bundled(self.fallback.products().to_vec())
            }
        }
    }

    /// A single product, or `None` if it does not exist.
    pub async fn product(&self, id: ProductId) -> Option<Loaded<Product>> {
        match self.api.get_product(id).await {
            Ok(product) => Some(Loaded::live(product)),
            Err(ApiError::NotFound(_)) => None,
            Err(e) => {
                warn!(error = %e, product_id = %id, "Product unavailable, using bundled catalog");
                self.fallback.product(id).cloned().map(Loaded::bundled)
            }
        }
    }
}

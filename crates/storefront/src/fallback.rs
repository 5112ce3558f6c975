//! Bundled catalog used when the backend is unavailable.
//!
//! The JSON is compiled into the binary and parsed once at startup, so a
//! malformed file fails the boot instead of a page render.

use ringside_core::{Course, CourseId, Lesson, Product, ProductId};
use serde::Deserialize;
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../data/catalog.json");

/// Errors loading the bundled catalog.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("bundled catalog is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bundled catalog lesson {lesson} references unknown course {course}")]
    OrphanLesson { lesson: String, course: CourseId },
}

/// Static courses, lessons and products.
#[derive(Debug, Clone, Deserialize)]
pub struct BundledCatalog {
    courses: Vec<Course>,
    lessons: Vec<Lesson>,
    products: Vec<Product>,
}

impl BundledCatalog {
    /// Parse the catalog compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or inconsistent.
    pub fn load() -> Result<Self, FallbackError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Parse a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a lesson points at a
    /// course that is not in the catalog.
    pub fn from_json(json: &str) -> Result<Self, FallbackError> {
        let mut catalog: Self = serde_json::from_str(json)?;

        if let Some(orphan) = catalog
            .lessons
            .iter()
            .find(|lesson| !catalog.courses.iter().any(|c| c.id == lesson.course_id))
        {
            return Err(FallbackError::OrphanLesson {
                lesson: orphan.title.clone(),
                course: orphan.course_id,
            });
        }

        catalog.lessons.sort_by_key(|l| (l.course_id, l.position));
        Ok(catalog)
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    #[must_use]
    pub fn course(&self, id: CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// Lessons of a course ordered by position.
    #[must_use]
    pub fn lessons(&self, course_id: CourseId) -> Vec<Lesson> {
        self.lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = BundledCatalog::load().unwrap();
        assert!(!catalog.courses().is_empty());
        assert!(!catalog.products().is_empty());
    }

    #[test]
    fn test_bundled_lesson_counts_match_courses() {
        let catalog = BundledCatalog::load().unwrap();
        for course in catalog.courses() {
            let lessons = catalog.lessons(course.id);
            assert_eq!(
                lessons.len(),
                course.lesson_count as usize,
                "lesson_count mismatch for {}",
                course.slug
            );
            assert!(lessons.windows(2).all(|w| w[0].position < w[1].position));
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = BundledCatalog::load().unwrap();
        assert!(catalog.course(CourseId::new(1)).is_some());
        assert!(catalog.course(CourseId::new(999)).is_none());
        assert!(catalog.product(ProductId::new(2)).is_some());
    }

    #[test]
    fn test_orphan_lesson_is_rejected() {
        let json = r#"{
            "courses": [],
            "lessons": [{"id": 1, "course_id": 5, "position": 1, "title": "Lost"}],
            "products": []
        }"#;
        let err = BundledCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, FallbackError::OrphanLesson { .. }));
    }
}

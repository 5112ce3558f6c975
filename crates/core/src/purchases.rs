//! The set of courses a visitor owns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::CourseId;

/// Purchased course IDs, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchasedCourses(BTreeSet<CourseId>);

impl PurchasedCourses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: CourseId) -> bool {
        self.0.contains(&id)
    }

    /// Record a purchase. Returns `true` if the course was not owned before.
    pub fn record(&mut self, id: CourseId) -> bool {
        self.0.insert(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = CourseId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<CourseId> for PurchasedCourses {
    fn extend<T: IntoIterator<Item = CourseId>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<CourseId> for PurchasedCourses {
    fn from_iter<T: IntoIterator<Item = CourseId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reports_new_purchases() {
        let mut owned = PurchasedCourses::new();
        assert!(owned.record(CourseId::new(3)));
        assert!(!owned.record(CourseId::new(3)));
        assert!(owned.contains(CourseId::new(3)));
        assert_eq!(owned.len(), 1);
    }

    #[test]
    fn test_serializes_as_sorted_array() {
        let owned: PurchasedCourses = [CourseId::new(5), CourseId::new(1)].into_iter().collect();
        assert_eq!(serde_json::to_string(&owned).unwrap(), "[1,5]");
    }
}

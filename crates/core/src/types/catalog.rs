//! Catalog records served by the Ringside backend.
//!
//! These mirror the backend's JSON payloads. Optional fields default so that
//! an older backend (or the bundled catalog) can omit them.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{CourseId, LessonId, ProductId, UserId};

/// Course difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    /// All levels in ascending difficulty.
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    /// Lowercase slug used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Human label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CourseLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown course level '{s}'"))
    }
}

/// A purchasable video course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub slug: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub instructor: String,
    #[serde(default)]
    pub level: CourseLevel,
    pub price: Decimal,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub lesson_count: u32,
}

/// One page of a lesson: a slice of the video plus its notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPage {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub course_id: CourseId,
    pub position: u32,
    pub title: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub pages: Vec<LessonPage>,
}

impl Lesson {
    /// Number of pages, saturating at `u32::MAX`.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }
}

/// A merchandise item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Whether `size` is acceptable for this product.
    ///
    /// Products without sizes accept only `None`; products with sizes
    /// require one of the listed values.
    #[must_use]
    pub fn accepts_size(&self, size: Option<&str>) -> bool {
        accepts_option(&self.sizes, size)
    }

    /// Whether `color` is acceptable for this product.
    #[must_use]
    pub fn accepts_color(&self, color: Option<&str>) -> bool {
        accepts_option(&self.colors, color)
    }
}

fn accepts_option(options: &[String], chosen: Option<&str>) -> bool {
    match chosen {
        None => options.is_empty(),
        Some(value) => options.iter().any(|o| o == value),
    }
}

/// The signed-in user's profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub purchased_course_ids: Vec<CourseId>,
}

impl UserProfile {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}

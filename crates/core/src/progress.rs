//! Page-based lesson progress and unlock rules.
//!
//! A course is an ordered list of lessons, each split into pages. Pages are
//! walked in order: lesson position first, then page index. The first page
//! is always open; every other page opens once the page before it is done.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Lesson, LessonId};

/// Errors from progress transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("lesson {0} page {1} does not exist in this course")]
    UnknownPage(LessonId, u32),
    #[error("lesson {0} page {1} is still locked")]
    Locked(LessonId, u32),
}

/// A page within a course. `page` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageRef {
    pub lesson_id: LessonId,
    pub page: u32,
}

impl PageRef {
    #[must_use]
    pub const fn new(lesson_id: LessonId, page: u32) -> Self {
        Self { lesson_id, page }
    }
}

/// Whether a page can be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Completed,
    Unlocked,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OutlineLesson {
    id: LessonId,
    pages: u32,
}

/// The page layout of a course, in playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseOutline {
    lessons: Vec<OutlineLesson>,
}

impl CourseOutline {
    /// Build an outline from `(lesson, page count)` pairs already in order.
    pub fn new(lessons: impl IntoIterator<Item = (LessonId, u32)>) -> Self {
        Self {
            lessons: lessons
                .into_iter()
                .map(|(id, pages)| OutlineLesson { id, pages })
                .collect(),
        }
    }

    /// Build an outline from lessons, sorting them by position.
    ///
    /// Lessons without pages still count as a single page so that video-only
    /// lessons can be marked watched.
    #[must_use]
    pub fn from_lessons(lessons: &[Lesson]) -> Self {
        let mut ordered: Vec<&Lesson> = lessons.iter().collect();
        ordered.sort_by_key(|lesson| (lesson.position, lesson.id));
        Self::new(
            ordered
                .into_iter()
                .map(|lesson| (lesson.id, lesson.page_count().max(1))),
        )
    }

    /// Total number of pages.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.lessons.iter().map(|l| l.pages as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_pages() == 0
    }

    /// Page count of a lesson, if it belongs to the course.
    #[must_use]
    pub fn pages_in(&self, lesson_id: LessonId) -> Option<u32> {
        self.lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .map(|l| l.pages)
    }

    /// Playback ordinal of a page.
    #[must_use]
    pub fn ordinal(&self, at: PageRef) -> Option<usize> {
        let mut offset = 0usize;
        for lesson in &self.lessons {
            if lesson.id == at.lesson_id {
                return (at.page < lesson.pages).then(|| offset + at.page as usize);
            }
            offset += lesson.pages as usize;
        }
        None
    }

    /// Page at a playback ordinal.
    #[must_use]
    pub fn at(&self, ordinal: usize) -> Option<PageRef> {
        let mut remaining = ordinal;
        for lesson in &self.lessons {
            let pages = lesson.pages as usize;
            if remaining < pages {
                let page = u32::try_from(remaining).ok()?;
                return Some(PageRef::new(lesson.id, page));
            }
            remaining -= pages;
        }
        None
    }

    /// The first page of the course.
    #[must_use]
    pub fn first(&self) -> Option<PageRef> {
        self.at(0)
    }

    /// All pages in playback order.
    pub fn pages(&self) -> impl Iterator<Item = PageRef> + '_ {
        self.lessons
            .iter()
            .flat_map(|lesson| (0..lesson.pages).map(move |page| PageRef::new(lesson.id, page)))
    }
}

/// Completed pages of one course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseProgress {
    completed: BTreeSet<PageRef>,
}

impl CourseProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_completed(&self, at: PageRef) -> bool {
        self.completed.contains(&at)
    }

    /// Completed pages, in key order.
    pub fn completed(&self) -> impl Iterator<Item = PageRef> + '_ {
        self.completed.iter().copied()
    }

    /// State of a page under the unlock rule.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::UnknownPage`] if the page is not in `outline`.
    pub fn page_state(&self, outline: &CourseOutline, at: PageRef) -> Result<PageState, ProgressError> {
        let ordinal = outline
            .ordinal(at)
            .ok_or(ProgressError::UnknownPage(at.lesson_id, at.page))?;

        if self.is_completed(at) {
            return Ok(PageState::Completed);
        }
        let previous_done = match ordinal.checked_sub(1) {
            None => true,
            Some(prev) => outline.at(prev).is_some_and(|p| self.is_completed(p)),
        };
        Ok(if previous_done {
            PageState::Unlocked
        } else {
            PageState::Locked
        })
    }

    /// Mark a page complete and return the next page, if any.
    ///
    /// Completing an already completed page is a no-op that still returns the
    /// next page.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::UnknownPage`] or [`ProgressError::Locked`].
    pub fn complete(&mut self, outline: &CourseOutline, at: PageRef) -> Result<Option<PageRef>, ProgressError> {
        match self.page_state(outline, at)? {
            PageState::Locked => return Err(ProgressError::Locked(at.lesson_id, at.page)),
            PageState::Completed | PageState::Unlocked => {}
        }
        self.completed.insert(at);

        let next = outline.ordinal(at).and_then(|ordinal| outline.at(ordinal + 1));
        Ok(next)
    }

    /// Where the player should open: the first incomplete page, or the last
    /// page once everything is done.
    #[must_use]
    pub fn resume_point(&self, outline: &CourseOutline) -> Option<PageRef> {
        outline
            .pages()
            .find(|page| !self.is_completed(*page))
            .or_else(|| outline.total_pages().checked_sub(1).and_then(|last| outline.at(last)))
    }

    /// Completed share of the course, rounded down.
    #[must_use]
    pub fn percent_complete(&self, outline: &CourseOutline) -> u8 {
        let total = outline.total_pages();
        if total == 0 {
            return 0;
        }
        let done = outline.pages().filter(|p| self.is_completed(*p)).count();
        u8::try_from(done * 100 / total).unwrap_or(100)
    }

    /// Whether every page of a lesson is completed.
    #[must_use]
    pub fn lesson_complete(&self, outline: &CourseOutline, lesson_id: LessonId) -> bool {
        outline
            .pages_in(lesson_id)
            .is_some_and(|pages| (0..pages).all(|page| self.is_completed(PageRef::new(lesson_id, page))))
    }

    /// Whether every page of the course is completed.
    #[must_use]
    pub fn course_complete(&self, outline: &CourseOutline) -> bool {
        !outline.is_empty() && outline.pages().all(|p| self.is_completed(p))
    }

    /// Union in progress reported elsewhere, dropping pages the outline
    /// does not know.
    pub fn merge(&mut self, outline: &CourseOutline, pages: impl IntoIterator<Item = PageRef>) {
        self.completed
            .extend(pages.into_iter().filter(|p| outline.ordinal(*p).is_some()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lesson(id: i32) -> LessonId {
        LessonId::new(id)
    }

    /// Two lessons: lesson 10 with 2 pages, lesson 20 with 1 page.
    fn outline() -> CourseOutline {
        CourseOutline::new([(lesson(10), 2), (lesson(20), 1)])
    }

    #[test]
    fn test_outline_ordinals() {
        let outline = outline();
        assert_eq!(outline.total_pages(), 3);
        assert_eq!(outline.ordinal(PageRef::new(lesson(20), 0)), Some(2));
        assert_eq!(outline.ordinal(PageRef::new(lesson(10), 2)), None);
        assert_eq!(outline.at(1), Some(PageRef::new(lesson(10), 1)));
        assert_eq!(outline.at(3), None);
    }

    #[test]
    fn test_only_first_page_starts_unlocked() {
        let outline = outline();
        let progress = CourseProgress::new();

        assert_eq!(
            progress.page_state(&outline, PageRef::new(lesson(10), 0)).unwrap(),
            PageState::Unlocked
        );
        assert_eq!(
            progress.page_state(&outline, PageRef::new(lesson(10), 1)).unwrap(),
            PageState::Locked
        );
        assert_eq!(
            progress.page_state(&outline, PageRef::new(lesson(20), 0)).unwrap(),
            PageState::Locked
        );
    }

    #[test]
    fn test_completing_unlocks_next_page_across_lessons() {
        let outline = outline();
        let mut progress = CourseProgress::new();

        let next = progress.complete(&outline, PageRef::new(lesson(10), 0)).unwrap();
        assert_eq!(next, Some(PageRef::new(lesson(10), 1)));

        let next = progress.complete(&outline, PageRef::new(lesson(10), 1)).unwrap();
        assert_eq!(next, Some(PageRef::new(lesson(20), 0)));
        assert!(progress.lesson_complete(&outline, lesson(10)));
        assert_eq!(
            progress.page_state(&outline, PageRef::new(lesson(20), 0)).unwrap(),
            PageState::Unlocked
        );

        let next = progress.complete(&outline, PageRef::new(lesson(20), 0)).unwrap();
        assert_eq!(next, None);
        assert!(progress.course_complete(&outline));
        assert_eq!(progress.percent_complete(&outline), 100);
    }

    #[test]
    fn test_locked_page_cannot_be_completed() {
        let outline = outline();
        let mut progress = CourseProgress::new();

        let err = progress
            .complete(&outline, PageRef::new(lesson(20), 0))
            .unwrap_err();
        assert_eq!(err, ProgressError::Locked(lesson(20), 0));
        assert_eq!(progress.percent_complete(&outline), 0);
    }

    #[test]
    fn test_unknown_page() {
        let outline = outline();
        let mut progress = CourseProgress::new();
        let err = progress
            .complete(&outline, PageRef::new(lesson(99), 0))
            .unwrap_err();
        assert_eq!(err, ProgressError::UnknownPage(lesson(99), 0));
    }

    #[test]
    fn test_complete_is_idempotent() {
        let outline = outline();
        let mut progress = CourseProgress::new();
        progress.complete(&outline, PageRef::new(lesson(10), 0)).unwrap();
        progress.complete(&outline, PageRef::new(lesson(10), 0)).unwrap();
        assert_eq!(progress.completed().count(), 1);
    }

    #[test]
    fn test_resume_point() {
        let outline = outline();
        let mut progress = CourseProgress::new();
        assert_eq!(progress.resume_point(&outline), Some(PageRef::new(lesson(10), 0)));

        progress.complete(&outline, PageRef::new(lesson(10), 0)).unwrap();
        assert_eq!(progress.resume_point(&outline), Some(PageRef::new(lesson(10), 1)));

        progress.complete(&outline, PageRef::new(lesson(10), 1)).unwrap();
        progress.complete(&outline, PageRef::new(lesson(20), 0)).unwrap();
        assert_eq!(progress.resume_point(&outline), Some(PageRef::new(lesson(20), 0)));

        assert_eq!(CourseProgress::new().resume_point(&CourseOutline::default()), None);
    }

    #[test]
    fn test_percent_rounds_down() {
        let outline = outline();
        let mut progress = CourseProgress::new();
        progress.complete(&outline, PageRef::new(lesson(10), 0)).unwrap();
        assert_eq!(progress.percent_complete(&outline), 33);
    }

    #[test]
    fn test_merge_ignores_unknown_pages() {
        let outline = outline();
        let mut progress = CourseProgress::new();
        progress.merge(
            &outline,
            [PageRef::new(lesson(10), 0), PageRef::new(lesson(77), 3)],
        );
        assert_eq!(progress.completed().collect::<Vec<_>>(), vec![PageRef::new(lesson(10), 0)]);
    }

    #[test]
    fn test_from_lessons_sorts_by_position_and_counts_empty_lessons() {
        use crate::types::{CourseId, LessonPage};

        let make = |id: i32, position: u32, pages: usize| Lesson {
            id: lesson(id),
            course_id: CourseId::new(1),
            position,
            title: format!("Lesson {id}"),
            video_url: None,
            duration_minutes: 5,
            pages: (0..pages)
                .map(|i| LessonPage {
                    title: format!("Page {i}"),
                    body: String::new(),
                })
                .collect(),
        };

        let outline = CourseOutline::from_lessons(&[make(2, 2, 3), make(1, 1, 0)]);
        assert_eq!(outline.first(), Some(PageRef::new(lesson(1), 0)));
        assert_eq!(outline.total_pages(), 4);
    }
}

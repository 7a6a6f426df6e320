//! Lesson visibility and chapter status.
//!
//! Everything here is derived from the viewer's current role and tier plus
//! the current progress set. Nothing is cached: upgrading a tier and asking
//! again yields the new answer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::content::{Chapter, Lesson};
use crate::types::{LessonId, PackageTier, Role};

/// The parts of an account that decide what it can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub role: Role,
    pub access_tier: PackageTier,
}

/// Learner-facing state of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterStatus {
    /// No lesson in the chapter is accessible.
    Locked,
    /// Accessible, nothing completed yet.
    Available,
    /// Some but not all accessible lessons completed.
    InProgress,
    /// Every accessible lesson completed.
    Completed,
}

/// Whether `viewer` may open `lesson`. Anonymous viewers see nothing.
#[must_use]
pub fn has_access(viewer: Option<&Viewer>, lesson: &Lesson) -> bool {
    viewer.is_some_and(|v| {
        v.role.bypasses_content_gate() || lesson.required_packages.contains(v.access_tier)
    })
}

fn accessible_counts(
    viewer: Option<&Viewer>,
    chapter: &Chapter,
    completed: &HashSet<LessonId>,
) -> (usize, usize) {
    chapter
        .lessons
        .iter()
        .filter(|lesson| has_access(viewer, lesson))
        .fold((0, 0), |(total, done), lesson| {
            (total + 1, done + usize::from(completed.contains(&lesson.id)))
        })
}

/// Percentage (0-100, rounded half up) of accessible lessons completed.
///
/// Lessons the viewer cannot open are ignored; a chapter with no accessible
/// lessons reports 0.
#[must_use]
pub fn chapter_progress(
    viewer: Option<&Viewer>,
    chapter: &Chapter,
    completed: &HashSet<LessonId>,
) -> u8 {
    let (total, done) = accessible_counts(viewer, chapter, completed);
    if total == 0 {
        return 0;
    }
    let percent = (done * 200 + total) / (total * 2);
    u8::try_from(percent).unwrap_or(100)
}

/// Status of `chapter` for `viewer` given the set of completed lessons.
#[must_use]
pub fn chapter_status(
    viewer: Option<&Viewer>,
    chapter: &Chapter,
    completed: &HashSet<LessonId>,
) -> ChapterStatus {
    let (total, done) = accessible_counts(viewer, chapter, completed);
    if total == 0 {
        ChapterStatus::Locked
    } else if done == total {
        ChapterStatus::Completed
    } else if done > 0 {
        ChapterStatus::InProgress
    } else {
        ChapterStatus::Available
    }
}

//! LMS content tree and learner progress.
//!
//! Modules contain chapters, chapters contain lessons. Each level is ordered
//! by `order_index`; lessons carry the set of package tiers that may open them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, ChapterId, LessonId, ModuleId, RequiredPackages};

/// Top-level grouping of chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub order_index: i32,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// Ordered group of lessons within a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub order_index: i32,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

/// A unit of learning content gated by package tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub chapter_id: ChapterId,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub content: Option<String>,
    pub duration_minutes: Option<i32>,
    pub is_published: bool,
    pub order_index: i32,
    pub required_packages: RequiredPackages,
    pub video_url: Option<String>,
    pub materials_url: Option<String>,
}

/// Completion record for one (account, lesson) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub account_id: AccountId,
    pub lesson_id: LessonId,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    /// Sort lessons by `order_index`, keeping insertion order for ties.
    pub fn sort_lessons(&mut self) {
        self.lessons.sort_by_key(|l| l.order_index);
    }
}

impl Module {
    /// Sort chapters (and their lessons) by `order_index`.
    pub fn sort_children(&mut self) {
        self.chapters.sort_by_key(|c| c.order_index);
        for chapter in &mut self.chapters {
            chapter.sort_lessons();
        }
    }
}

/// Assemble flat rows into an ordered module tree.
///
/// Chapters whose module is missing and lessons whose chapter is missing are
/// dropped.
#[must_use]
pub fn assemble_tree(
    mut modules: Vec<Module>,
    chapters: Vec<Chapter>,
    lessons: Vec<Lesson>,
) -> Vec<Module> {
    let mut chapters = chapters;
    for lesson in lessons {
        if let Some(chapter) = chapters.iter_mut().find(|c| c.id == lesson.chapter_id) {
            chapter.lessons.push(lesson);
        }
    }
    for chapter in chapters {
        if let Some(module) = modules.iter_mut().find(|m| m.id == chapter.module_id) {
            module.chapters.push(chapter);
        }
    }
    modules.sort_by_key(|m| m.order_index);
    for module in &mut modules {
        module.sort_children();
    }
    modules
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;
    use crate::types::PackageTier;

    pub fn lesson(chapter_id: ChapterId, order_index: i32, tiers: &[PackageTier]) -> Lesson {
        Lesson {
            id: LessonId::generate(),
            chapter_id,
            title: format!("Lesson {order_index}"),
            description: None,
            difficulty: Some("beginner".to_owned()),
            content: Some("body".to_owned()),
            duration_minutes: Some(10),
            is_published: true,
            order_index,
            required_packages: RequiredPackages::new(tiers.iter().copied()).unwrap(),
            video_url: None,
            materials_url: None,
        }
    }

    pub fn chapter(module_id: ModuleId, order_index: i32) -> Chapter {
        Chapter {
            id: ChapterId::generate(),
            module_id,
            title: format!("Chapter {order_index}"),
            description: None,
            is_published: true,
            order_index,
            lessons: Vec::new(),
        }
    }

    pub fn module(order_index: i32) -> Module {
        Module {
            id: ModuleId::generate(),
            title: format!("Module {order_index}"),
            description: None,
            is_published: true,
            order_index,
            chapters: Vec::new(),
        }
    }
}

//! LMS write models.
//!
//! Request bodies use the column names of the content tables, so they
//! deserialize straight into these types.

use serde::Deserialize;

use booster_core::{ChapterId, Lesson, ModuleId, RequiredPackages};

#[derive(Debug, Clone, Deserialize)]
pub struct NewModule {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChapter {
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLesson {
    pub chapter_id: ChapterId,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub content: Option<String>,
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub order_index: i32,
    #[serde(alias = "required_package")]
    pub required_packages: RequiredPackages,
    pub video_url: Option<String>,
    pub materials_url: Option<String>,
}

/// Partial lesson update.
///
/// Only these fields can change; `id` and `chapter_id` in a request body are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub content: Option<String>,
    pub duration_minutes: Option<i32>,
    pub is_published: Option<bool>,
    pub order_index: Option<i32>,
    #[serde(alias = "required_package")]
    pub required_packages: Option<RequiredPackages>,
    pub video_url: Option<String>,
    pub materials_url: Option<String>,
}

impl LessonPatch {
    /// No field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.difficulty.is_none()
            && self.content.is_none()
            && self.duration_minutes.is_none()
            && self.is_published.is_none()
            && self.order_index.is_none()
            && self.required_packages.is_none()
            && self.video_url.is_none()
            && self.materials_url.is_none()
    }

    /// Overwrite the provided fields of `lesson`.
    pub fn apply(self, lesson: &mut Lesson) {
        if let Some(title) = self.title {
            lesson.title = title;
        }
        if self.description.is_some() {
            lesson.description = self.description;
        }
        if self.difficulty.is_some() {
            lesson.difficulty = self.difficulty;
        }
        if self.content.is_some() {
            lesson.content = self.content;
        }
        if self.duration_minutes.is_some() {
            lesson.duration_minutes = self.duration_minutes;
        }
        if let Some(published) = self.is_published {
            lesson.is_published = published;
        }
        if let Some(order_index) = self.order_index {
            lesson.order_index = order_index;
        }
        if let Some(required) = self.required_packages {
            lesson.required_packages = required;
        }
        if self.video_url.is_some() {
            lesson.video_url = self.video_url;
        }
        if self.materials_url.is_some() {
            lesson.materials_url = self.materials_url;
        }
    }
}

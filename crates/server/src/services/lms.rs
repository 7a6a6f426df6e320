//! LMS content, access annotations and learner progress.
//!
//! The raw module tree is cached for five minutes and dropped on every CMS
//! write. Access is never cached: each request annotates the shared tree for
//! its own viewer and progress set.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use booster_core::{
    AccountId, Chapter, ChapterId, ChapterStatus, Lesson, LessonId, Module, ModuleId,
    RequiredPackages, UserProgress, Viewer, chapter_progress, chapter_status, has_access,
};

use crate::db::{Store, StoreError};
use crate::models::{LessonPatch, NewChapter, NewLesson, NewModule};

/// How long an unchanged content tree is served from memory.
pub const CONTENT_TTL: Duration = Duration::from_secs(300);

/// Errors from LMS operations.
#[derive(Debug, Error)]
pub enum LmsError {
    #[error("no updatable fields were provided")]
    EmptyUpdate,

    /// The viewer's package does not include this lesson.
    #[error("lesson {0} is not included in your package")]
    Locked(LessonId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Shared cache of the full content tree.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<ContentCacheInner>,
}

struct ContentCacheInner {
    cache: Cache<(), Arc<Vec<Module>>>,
    /// Bumped on every invalidation so a load that raced a write is not stored.
    generation: AtomicU64,
}

impl ContentCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(ContentCacheInner {
                cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    async fn tree(&self, store: &dyn Store) -> Result<Arc<Vec<Module>>, StoreError> {
        if let Some(tree) = self.inner.cache.get(&()).await {
            debug!("Cache hit for content tree");
            return Ok(tree);
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        let tree = Arc::new(store.content_tree().await?);
        if self.inner.generation.load(Ordering::Acquire) == generation {
            self.inner.cache.insert((), Arc::clone(&tree)).await;
        }
        Ok(tree)
    }

    /// Drop the cached tree.
    pub async fn invalidate(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.cache.invalidate(&()).await;
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(CONTENT_TTL)
    }
}

/// Module as seen by one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleView {
    pub id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub order_index: i32,
    pub chapters: Vec<ChapterView>,
}

/// Chapter with the viewer's status and progress.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterView {
    pub id: ChapterId,
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub order_index: i32,
    pub status: ChapterStatus,
    pub progress: u8,
    pub lessons: Vec<LessonView>,
}

/// Lesson with the viewer's access. Body fields are withheld when locked.
#[derive(Debug, Clone, Serialize)]
pub struct LessonView {
    pub id: LessonId,
    pub chapter_id: ChapterId,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub duration_minutes: Option<i32>,
    pub is_published: bool,
    pub order_index: i32,
    pub required_packages: RequiredPackages,
    pub accessible: bool,
    pub completed: bool,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub materials_url: Option<String>,
}

impl LessonView {
    fn new(lesson: &Lesson, accessible: bool, completed: bool) -> Self {
        let body = |field: &Option<String>| if accessible { field.clone() } else { None };
        Self {
            id: lesson.id,
            chapter_id: lesson.chapter_id,
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            difficulty: lesson.difficulty.clone(),
            duration_minutes: lesson.duration_minutes,
            is_published: lesson.is_published,
            order_index: lesson.order_index,
            required_packages: lesson.required_packages.clone(),
            accessible,
            completed,
            content: body(&lesson.content),
            video_url: body(&lesson.video_url),
            materials_url: body(&lesson.materials_url),
        }
    }
}

/// Annotate the tree for `viewer`.
///
/// Unpublished items are only shown to viewers that bypass the content gate.
#[must_use]
pub fn annotate(
    tree: &[Module],
    viewer: Option<&Viewer>,
    completed: &HashSet<LessonId>,
) -> Vec<ModuleView> {
    let sees_drafts = viewer.is_some_and(|v| v.role.bypasses_content_gate());

    tree.iter()
        .filter(|m| sees_drafts || m.is_published)
        .map(|module| ModuleView {
            id: module.id,
            title: module.title.clone(),
            description: module.description.clone(),
            is_published: module.is_published,
            order_index: module.order_index,
            chapters: module
                .chapters
                .iter()
                .filter(|c| sees_drafts || c.is_published)
                .map(|chapter| annotate_chapter(chapter, viewer, completed, sees_drafts))
                .collect(),
        })
        .collect()
}

fn annotate_chapter(
    chapter: &Chapter,
    viewer: Option<&Viewer>,
    completed: &HashSet<LessonId>,
    sees_drafts: bool,
) -> ChapterView {
    let visible = Chapter {
        lessons: chapter
            .lessons
            .iter()
            .filter(|l| sees_drafts || l.is_published)
            .cloned()
            .collect(),
        ..chapter.clone()
    };

    ChapterView {
        id: visible.id,
        module_id: visible.module_id,
        title: visible.title.clone(),
        description: visible.description.clone(),
        is_published: visible.is_published,
        order_index: visible.order_index,
        status: chapter_status(viewer, &visible, completed),
        progress: chapter_progress(viewer, &visible, completed),
        lessons: visible
            .lessons
            .iter()
            .map(|lesson| {
                LessonView::new(
                    lesson,
                    has_access(viewer, lesson),
                    completed.contains(&lesson.id),
                )
            })
            .collect(),
    }
}

/// LMS service.
pub struct LmsService<'a> {
    store: &'a dyn Store,
    cache: &'a ContentCache,
}

impl<'a> LmsService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, cache: &'a ContentCache) -> Self {
        Self { store, cache }
    }

    /// The content tree annotated for the given account.
    ///
    /// # Errors
    ///
    /// Returns `LmsError::Store` if the store fails.
    pub async fn content(
        &self,
        viewer: Option<(AccountId, Viewer)>,
    ) -> Result<Vec<ModuleView>, LmsError> {
        let tree = self.cache.tree(self.store).await?;

        let completed = match viewer {
            Some((account_id, _)) => self.completed_lessons(account_id).await?,
            None => HashSet::new(),
        };

        Ok(annotate(
            &tree,
            viewer.as_ref().map(|(_, v)| v),
            &completed,
        ))
    }

    async fn completed_lessons(&self, account_id: AccountId) -> Result<HashSet<LessonId>, LmsError> {
        Ok(self
            .store
            .list_progress(account_id)
            .await?
            .into_iter()
            .filter(|p| p.completed)
            .map(|p| p.lesson_id)
            .collect())
    }

    /// # Errors
    ///
    /// Returns `LmsError::Store` if the store fails.
    #[instrument(skip(self, module), fields(title = %module.title))]
    pub async fn create_module(&self, module: NewModule) -> Result<ModuleId, LmsError> {
        let id = self.store.create_module(module).await?;
        self.cache.invalidate().await;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the module does not exist.
    #[instrument(skip(self, chapter), fields(module_id = %chapter.module_id))]
    pub async fn create_chapter(&self, chapter: NewChapter) -> Result<ChapterId, LmsError> {
        let id = self.store.create_chapter(chapter).await?;
        self.cache.invalidate().await;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the chapter does not exist.
    #[instrument(skip(self, lesson), fields(chapter_id = %lesson.chapter_id))]
    pub async fn create_lesson(&self, lesson: NewLesson) -> Result<LessonId, LmsError> {
        let id = self.store.create_lesson(lesson).await?;
        self.cache.invalidate().await;
        Ok(id)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `LmsError::EmptyUpdate` if the patch changes nothing and
    /// `StoreError::NotFound` for an unknown lesson.
    #[instrument(skip(self, patch))]
    pub async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> Result<Lesson, LmsError> {
        if patch.is_empty() {
            return Err(LmsError::EmptyUpdate);
        }
        let lesson = self.store.update_lesson(id, patch).await?;
        self.cache.invalidate().await;
        Ok(lesson)
    }

    /// Progress rows of an account.
    ///
    /// # Errors
    ///
    /// Returns `LmsError::Store` if the store fails.
    pub async fn progress(&self, account_id: AccountId) -> Result<Vec<UserProgress>, LmsError> {
        Ok(self.store.list_progress(account_id).await?)
    }

    /// Mark a lesson done (or not done) for the viewer.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown lesson and
    /// `LmsError::Locked` if the viewer cannot open it.
    #[instrument(skip(self, viewer))]
    pub async fn record_progress(
        &self,
        account_id: AccountId,
        viewer: &Viewer,
        lesson_id: LessonId,
        completed: bool,
    ) -> Result<UserProgress, LmsError> {
        let lesson = self
            .store
            .get_lesson(lesson_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("lesson {lesson_id}")))?;

        if !has_access(Some(viewer), &lesson) {
            return Err(LmsError::Locked(lesson_id));
        }

        Ok(self
            .store
            .record_progress(account_id, lesson_id, completed)
            .await?)
    }
}

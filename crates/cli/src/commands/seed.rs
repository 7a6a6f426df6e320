//! Seed the LMS content tree from a YAML file.
//!
//! The file is a list of modules, each with nested chapters and lessons.
//! Everything is validated before connecting to the database, then inserted
//! parent-first so chapters and lessons get their parent IDs.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use booster_core::RequiredPackages;
use booster_server::db::{self, PgStore, Store};
use booster_server::models::{NewChapter, NewLesson, NewModule};

/// One module of the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedModule {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "published")]
    pub is_published: bool,
    #[serde(default)]
    pub chapters: Vec<SeedChapter>,
}

#[derive(Debug, Deserialize)]
pub struct SeedChapter {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "published")]
    pub is_published: bool,
    #[serde(default)]
    pub lessons: Vec<SeedLesson>,
}

#[derive(Debug, Deserialize)]
pub struct SeedLesson {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub content: Option<String>,
    pub duration_minutes: Option<i32>,
    #[serde(default = "published")]
    pub is_published: bool,
    pub required_packages: RequiredPackages,
    pub video_url: Option<String>,
    pub materials_url: Option<String>,
}

const fn published() -> bool {
    true
}

/// Problems that make a seed file unusable.
pub fn validate(modules: &[SeedModule]) -> Vec<String> {
    let mut errors = Vec::new();
    for module in modules {
        if module.title.trim().is_empty() {
            errors.push("module with empty title".to_string());
        }
        for chapter in &module.chapters {
            if chapter.title.trim().is_empty() {
                errors.push(format!("chapter with empty title in '{}'", module.title));
            }
            for lesson in &chapter.lessons {
                if lesson.title.trim().is_empty() {
                    errors.push(format!("lesson with empty title in '{}'", chapter.title));
                }
                if lesson.duration_minutes.is_some_and(|m| m < 0) {
                    errors.push(format!("negative duration for lesson '{}'", lesson.title));
                }
            }
        }
    }
    errors
}

/// Counts of inserted rows.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub modules: usize,
    pub chapters: usize,
    pub lessons: usize,
}

/// Insert the tree through the store. `order_index` follows file order.
///
/// # Errors
///
/// Returns the first store error; rows inserted before it remain.
pub async fn insert(
    store: &dyn Store,
    modules: Vec<SeedModule>,
) -> Result<SeedSummary, booster_server::db::StoreError> {
    let mut summary = SeedSummary::default();

    for (module_index, module) in (0_i32..).zip(modules) {
        let module_id = store
            .create_module(NewModule {
                title: module.title,
                description: module.description,
                is_published: module.is_published,
                order_index: module_index,
            })
            .await?;
        summary.modules += 1;

        for (chapter_index, chapter) in (0_i32..).zip(module.chapters) {
            let chapter_id = store
                .create_chapter(NewChapter {
                    module_id,
                    title: chapter.title,
                    description: chapter.description,
                    is_published: chapter.is_published,
                    order_index: chapter_index,
                })
                .await?;
            summary.chapters += 1;

            for (lesson_index, lesson) in (0_i32..).zip(chapter.lessons) {
                store
                    .create_lesson(NewLesson {
                        chapter_id,
                        title: lesson.title,
                        description: lesson.description,
                        difficulty: lesson.difficulty,
                        content: lesson.content,
                        duration_minutes: lesson.duration_minutes,
                        is_published: lesson.is_published,
                        order_index: lesson_index,
                        required_packages: lesson.required_packages,
                        video_url: lesson.video_url,
                        materials_url: lesson.materials_url,
                    })
                    .await?;
                summary.lessons += 1;
            }
        }
    }

    Ok(summary)
}

/// Seed LMS content from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or the database fails.
pub async fn content(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading LMS content from file");

    // Read and validate YAML before connecting to database
    let text = tokio::fs::read_to_string(path).await?;
    let modules: Vec<SeedModule> = serde_yaml::from_str(&text)?;

    let errors = validate(&modules);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let database_url = super::database_url()?;
    let store = PgStore::new(db::create_pool(&database_url).await?);
    info!("Connected to database");

    let summary = insert(&store, modules).await?;

    info!("Seeding complete!");
    info!("  Modules: {}", summary.modules);
    info!("  Chapters: {}", summary.chapters);
    info!("  Lessons: {}", summary.lessons);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use booster_core::{PackageTier, Role, Viewer, has_access};
    use booster_server::db::MemoryStore;

    const BUNDLED: &str = include_str!("../../seed/lms.yaml");

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let modules: Vec<SeedModule> = serde_yaml::from_str(BUNDLED).unwrap();
        assert!(!modules.is_empty());
        assert!(validate(&modules).is_empty());
    }

    #[test]
    fn test_validate_reports_empty_titles() {
        let modules: Vec<SeedModule> = serde_yaml::from_str(
            r"
- title: ' '
  chapters:
    - title: Bab
      lessons:
        - title: ''
          required_packages: [medium]
",
        )
        .unwrap();
        assert_eq!(validate(&modules).len(), 2);
    }

    #[test]
    fn test_unknown_tier_is_rejected() {
        let result: Result<Vec<SeedModule>, _> = serde_yaml::from_str(
            r"
- title: Modul
  chapters:
    - title: Bab
      lessons:
        - title: Materi
          required_packages: [gold]
",
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_insert_builds_ordered_tree() {
        let store = MemoryStore::new();
        let modules: Vec<SeedModule> = serde_yaml::from_str(BUNDLED).unwrap();
        let expected_lessons: usize = modules
            .iter()
            .flat_map(|m| &m.chapters)
            .map(|c| c.lessons.len())
            .sum();

        let summary = insert(&store, modules).await.unwrap();
        assert_eq!(summary.lessons, expected_lessons);

        let tree = store.content_tree().await.unwrap();
        assert_eq!(tree.len(), summary.modules);
        let first = tree.first().unwrap();
        assert_eq!(first.order_index, 0);

        let large = Viewer {
            role: Role::User,
            access_tier: PackageTier::Large,
        };
        let lessons = tree
            .iter()
            .flat_map(|m| &m.chapters)
            .flat_map(|c| &c.lessons);
        assert!(lessons.clone().any(|l| has_access(Some(&large), l)));
        assert!(lessons.clone().all(|l| !has_access(None, l)));
    }
}

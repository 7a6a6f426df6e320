//! LMS handlers: the gated content tree, CMS writes and learner progress.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use booster_core::{AccountId, LessonId, UserProgress};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::{OptionalAccount, RequireAccount, RequireAdmin};
use crate::models::{LessonPatch, NewChapter, NewLesson, NewModule};
use crate::services::lms::ModuleView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    #[serde(default = "default_completed")]
    pub completed: bool,
}

const fn default_completed() -> bool {
    true
}

/// The content tree annotated for the caller.
///
/// The account is reloaded so a tier upgrade applies without signing in again.
pub async fn content(
    State(state): State<AppState>,
    OptionalAccount(current): OptionalAccount,
) -> Result<Json<Vec<ModuleView>>> {
    let viewer = match current {
        Some(current) => state
            .store()
            .get_account(current.id)
            .await?
            .map(|account| (account.id, account.viewer())),
        None => None,
    };

    Ok(Json(state.lms().content(viewer).await?))
}

fn created(id: impl serde::Serialize) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": id })),
    )
}

pub async fn create_module(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(body): Json<NewModule>,
) -> Result<(StatusCode, Json<Value>)> {
    let id = state.lms().create_module(body).await?;
    Ok(created(id))
}

pub async fn create_chapter(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(body): Json<NewChapter>,
) -> Result<(StatusCode, Json<Value>)> {
    let id = state.lms().create_chapter(body).await?;
    Ok(created(id))
}

pub async fn create_lesson(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(body): Json<NewLesson>,
) -> Result<(StatusCode, Json<Value>)> {
    let id = state.lms().create_lesson(body).await?;
    Ok(created(id))
}

/// Partial lesson update. Unknown fields are ignored.
pub async fn update_lesson(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<LessonId>,
    Json(patch): Json<LessonPatch>,
) -> Result<Json<Value>> {
    state.lms().update_lesson(id, patch).await?;
    Ok(Json(json!({ "success": true, "message": "Lesson updated" })))
}

/// Progress rows of an account.
pub async fn progress(
    State(state): State<AppState>,
    RequireAccount(current): RequireAccount,
    Path(user_id): Path<AccountId>,
) -> Result<Json<Vec<UserProgress>>> {
    if !current.may_act_for(user_id) {
        return Err(AppError::Forbidden(
            "Cannot view another account's progress".to_string(),
        ));
    }
    Ok(Json(state.lms().progress(user_id).await?))
}

/// Mark a lesson done for the signed-in account.
pub async fn record_progress(
    State(state): State<AppState>,
    RequireAccount(current): RequireAccount,
    Path(lesson_id): Path<LessonId>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<UserProgress>> {
    let account = state
        .store()
        .get_account(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Please sign in".to_string()))?;

    let progress = state
        .lms()
        .record_progress(account.id, &account.viewer(), lesson_id, body.completed)
        .await?;
    Ok(Json(progress))
}

//! AI website-builder handlers.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use booster_core::{BuildJobId, BuildJobStatus};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::{OptionalAccount, RequireAdmin};
use crate::models::{BuildJob, BuildJobResolution};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default, alias = "rawPrompt")]
    pub raw_prompt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    #[serde(alias = "result_url")]
    pub result_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FailRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub job_id: BuildJobId,
    pub professional_prompt: String,
    pub estimated_duration_minutes: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: BuildJobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl From<BuildJob> for StatusResponse {
    fn from(job: BuildJob) -> Self {
        Self {
            status: job.status,
            result_url: job.result_url,
            failure_reason: job.failure_reason,
        }
    }
}

/// Turn a one-line request into a professional brief and open a job.
pub async fn start(
    State(state): State<AppState>,
    OptionalAccount(current): OptionalAccount,
    Json(body): Json<StartRequest>,
) -> Result<Json<StartResponse>> {
    let job = state
        .builder()
        .start(current.map(|c| c.id), &body.raw_prompt)
        .await?;

    Ok(Json(StartResponse {
        job_id: job.id,
        professional_prompt: job.professional_prompt,
        estimated_duration_minutes: job.estimated_duration_minutes,
    }))
}

pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<BuildJobId>,
) -> Result<Json<StatusResponse>> {
    Ok(Json(state.builder().status(job_id).await?.into()))
}

/// Operator reports the generated site.
pub async fn complete(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(job_id): Path<BuildJobId>,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<StatusResponse>> {
    let job = state
        .builder()
        .resolve(
            job_id,
            BuildJobResolution::Ready {
                result_url: body.result_url,
            },
        )
        .await?;
    Ok(Json(job.into()))
}

/// Operator gives up on a job.
pub async fn fail(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(job_id): Path<BuildJobId>,
    body: std::result::Result<Json<FailRequest>, AppError>,
) -> Result<Json<StatusResponse>> {
    // The reason is optional, so is the body
    let reason = body.ok().and_then(|Json(b)| b.reason);
    let job = state
        .builder()
        .resolve(job_id, BuildJobResolution::Failed { reason })
        .await?;
    Ok(Json(job.into()))
}

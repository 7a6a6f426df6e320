//! Prompt-builder jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use booster_core::{AccountId, BuildJobId, BuildJobStatus};

/// Minutes a generated site usually takes to come back from the builder.
pub const ESTIMATED_BUILD_MINUTES: i32 = 30;

/// A website build started from a professional prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BuildJob {
    pub id: BuildJobId,
    pub account_id: Option<AccountId>,
    pub raw_prompt: String,
    pub professional_prompt: String,
    pub status: BuildJobStatus,
    pub result_url: Option<String>,
    pub failure_reason: Option<String>,
    pub estimated_duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

/// Operator outcome for a processing job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildJobResolution {
    Ready { result_url: String },
    Failed { reason: Option<String> },
}

/// The job was already resolved differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("build job is already {0:?}")]
pub struct JobAlreadyResolved(pub BuildJobStatus);

impl BuildJob {
    /// A freshly generated job in `processing`.
    #[must_use]
    pub fn start(account_id: Option<AccountId>, raw_prompt: String, professional_prompt: String) -> Self {
        Self {
            id: BuildJobId::generate(),
            account_id,
            raw_prompt,
            professional_prompt,
            status: BuildJobStatus::Processing,
            result_url: None,
            failure_reason: None,
            estimated_duration_minutes: ESTIMATED_BUILD_MINUTES,
            created_at: Utc::now(),
        }
    }

    /// Apply an operator outcome.
    ///
    /// Returns `Ok(None)` when the job already carries this exact outcome.
    ///
    /// # Errors
    ///
    /// Returns [`JobAlreadyResolved`] if the job was resolved with a different
    /// outcome.
    pub fn resolve(
        &self,
        resolution: &BuildJobResolution,
    ) -> Result<Option<Self>, JobAlreadyResolved> {
        match (self.status, resolution) {
            (BuildJobStatus::Processing, BuildJobResolution::Ready { result_url }) => Ok(Some(Self {
                status: BuildJobStatus::Ready,
                result_url: Some(result_url.clone()),
                ..self.clone()
            })),
            (BuildJobStatus::Processing, BuildJobResolution::Failed { reason }) => Ok(Some(Self {
                status: BuildJobStatus::Failed,
                failure_reason: reason.clone(),
                ..self.clone()
            })),
            (BuildJobStatus::Ready, BuildJobResolution::Ready { result_url })
                if self.result_url.as_deref() == Some(result_url.as_str()) =>
            {
                Ok(None)
            }
            (BuildJobStatus::Failed, BuildJobResolution::Failed { .. }) => Ok(None),
            (status, _) => Err(JobAlreadyResolved(status)),
        }
    }
}

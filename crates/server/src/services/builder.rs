//! AI prompt builder.
//!
//! Turns a one-line request ("buatkan web untuk jualan kopi") into a full
//! website-generation brief and records a build job for the operator who
//! runs the generator.

use thiserror::Error;
use tracing::instrument;

use booster_core::{AccountId, BuildJobId};

use crate::db::{Store, StoreError};
use crate::models::{BuildJob, BuildJobResolution};
use crate::services::prompt::{CompletionModel, PromptError};

/// Instruction sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "\
Anda adalah prompt engineer senior untuk desain dan pengembangan website. \
Anda menerima satu baris permintaan mentah dari pengguna dan mengubahnya \
menjadi brief yang detail dan profesional untuk AI generator website.

Tangkap ide inti permintaan lalu kembangkan secara kreatif. Jika detail tidak \
disebutkan, ciptakan detail yang masuk akal sehingga hasilnya terasa unik dan \
lengkap. Brief harus memuat: nama bisnis dan identitasnya; gaya desain dan \
nuansa visual; dua sampai tiga warna utama; struktur halaman (misalnya Home, \
Tentang Kami, Produk/Layanan, Galeri, Kontak); isi setiap halaman termasuk \
hero section, cerita singkat, contoh produk atau layanan, dan informasi \
kontak; satu call-to-action utama; serta target audiens.

Tulis HANYA satu paragraf deskriptif yang mengalir, tanpa poin atau daftar, \
dalam Bahasa Indonesia yang profesional.";

/// Errors from the prompt builder.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// No language model is configured.
    #[error("language model is not configured")]
    NotConfigured,

    #[error("language model error: {0}")]
    Model(#[from] PromptError),

    /// The model answered with nothing usable.
    #[error("language model returned an empty prompt")]
    EmptyOutput,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Prompt-builder service.
pub struct BuilderService<'a> {
    store: &'a dyn Store,
    model: Option<&'a dyn CompletionModel>,
}

impl<'a> BuilderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, model: Option<&'a dyn CompletionModel>) -> Self {
        Self { store, model }
    }

    /// Generate the professional prompt and record a `processing` job.
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::EmptyPrompt` for blank input,
    /// `BuilderError::NotConfigured` without a model, and
    /// `BuilderError::Model` / `BuilderError::EmptyOutput` when the model
    /// fails.
    #[instrument(skip(self, raw_prompt))]
    pub async fn start(
        &self,
        account_id: Option<AccountId>,
        raw_prompt: &str,
    ) -> Result<BuildJob, BuilderError> {
        let raw_prompt = raw_prompt.trim();
        if raw_prompt.is_empty() {
            return Err(BuilderError::EmptyPrompt);
        }
        let model = self.model.ok_or(BuilderError::NotConfigured)?;

        let professional = model.complete(SYSTEM_INSTRUCTION, raw_prompt).await?;
        let professional = professional.trim();
        if professional.is_empty() {
            return Err(BuilderError::EmptyOutput);
        }

        let job = BuildJob::start(account_id, raw_prompt.to_string(), professional.to_string());
        self.store.insert_build_job(&job).await?;

        tracing::info!(job_id = %job.id, "Build job started");
        Ok(job)
    }

    /// Current state of a job.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no such job exists.
    pub async fn status(&self, id: BuildJobId) -> Result<BuildJob, BuilderError> {
        self.store
            .get_build_job(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("build job {id}")).into())
    }

    /// Record the operator's outcome.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown job and
    /// `StoreError::Conflict` if it was resolved differently before.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        id: BuildJobId,
        resolution: BuildJobResolution,
    ) -> Result<BuildJob, BuilderError> {
        let job = self.store.resolve_build_job(id, resolution).await?;
        tracing::info!(job_id = %job.id, status = ?job.status, "Build job resolved");
        Ok(job)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use async_trait::async_trait;
    use booster_core::BuildJobStatus;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionModel for Canned {
        async fn complete(&self, system: &str, message: &str) -> Result<String, PromptError> {
            assert_eq!(system, SYSTEM_INSTRUCTION);
            assert!(!message.starts_with(' '));
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_start_persists_processing_job() {
        let store = MemoryStore::new();
        let model = Canned("  Kopi Senja adalah website kedai kopi modern.  ");
        let builder = BuilderService::new(&store, Some(&model));

        let job = builder.start(None, "  web jualan kopi ").await.unwrap();
        assert_eq!(job.status, BuildJobStatus::Processing);
        assert_eq!(job.raw_prompt, "web jualan kopi");
        assert_eq!(
            job.professional_prompt,
            "Kopi Senja adalah website kedai kopi modern."
        );
        assert_eq!(job.estimated_duration_minutes, 30);
        assert_eq!(builder.status(job.id).await.unwrap(), job);
    }

    #[tokio::test]
    async fn test_start_failures() {
        let store = MemoryStore::new();

        let err = BuilderService::new(&store, Some(&Canned("x")))
            .start(None, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, BuilderError::EmptyPrompt));

        let err = BuilderService::new(&store, None)
            .start(None, "web kopi")
            .await
            .unwrap_err();
        assert!(matches!(err, BuilderError::NotConfigured));

        let err = BuilderService::new(&store, Some(&Canned(" \n ")))
            .start(None, "web kopi")
            .await
            .unwrap_err();
        assert!(matches!(err, BuilderError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_resolve_and_conflict() {
        let store = MemoryStore::new();
        let model = Canned("Brief");
        let builder = BuilderService::new(&store, Some(&model));
        let job = builder.start(None, "web kopi").await.unwrap();

        let ready = BuildJobResolution::Ready {
            result_url: "https://kopi-senja.app".to_string(),
        };
        let done = builder.resolve(job.id, ready.clone()).await.unwrap();
        assert_eq!(done.status, BuildJobStatus::Ready);
        assert_eq!(builder.resolve(job.id, ready).await.unwrap(), done);

        let err = builder
            .resolve(job.id, BuildJobResolution::Failed { reason: None })
            .await
            .unwrap_err();
        assert!(matches!(err, BuilderError::Store(StoreError::Conflict(_))));

        let err = builder.status(BuildJobId::generate()).await.unwrap_err();
        assert!(matches!(err, BuilderError::Store(StoreError::NotFound(_))));
    }
}

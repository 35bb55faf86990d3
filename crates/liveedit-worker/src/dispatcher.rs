//! Job dispatcher.
//!
//! Accepts edit requests, registers the job record, and runs the
//! pipeline on a bounded pool of tokio tasks. Callers poll status
//! through the same dispatcher; the result path is only handed out
//! once the job has succeeded.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use liveedit_media::Renderer;
use liveedit_models::{
    AudioOverlaySpec, Job, JobId, JobKind, JobStatus, PlanValidationError, StagedAsset,
};
use liveedit_planner::PlanResolver;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{self, ClipProber, JobContext};
use crate::store::JobStore;

/// Bounded-concurrency job dispatcher.
pub struct JobDispatcher {
    ctx: Arc<JobContext>,
    job_semaphore: Arc<Semaphore>,
}

impl JobDispatcher {
    pub fn new(
        config: WorkerConfig,
        resolver: Arc<dyn PlanResolver>,
        prober: Arc<dyn ClipProber>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let ctx = Arc::new(JobContext {
            config,
            store: JobStore::new(),
            resolver,
            prober,
            renderer,
        });
        Self { ctx, job_semaphore }
    }

    /// Accept an edit request and start it as soon as a slot frees up.
    ///
    /// The clip-count limit is enforced here so an oversized request
    /// is rejected before any job record exists.
    pub async fn enqueue(
        &self,
        kind: JobKind,
        clips: Vec<StagedAsset>,
        instruction: impl Into<String>,
        overlay: Option<AudioOverlaySpec>,
    ) -> WorkerResult<JobId> {
        if clips.is_empty() {
            return Err(WorkerError::Plan(PlanValidationError::EmptyClipSet));
        }
        if clips.len() > self.ctx.config.max_clips {
            return Err(WorkerError::Plan(PlanValidationError::TooManyClips {
                count: clips.len(),
                max: self.ctx.config.max_clips,
            }));
        }

        let job = Job::new(kind, instruction);
        let job_id = job.id.clone();
        self.ctx.store.insert(job).await;
        info!(job_id = %job_id, clips = clips.len(), "job enqueued");

        let ctx = Arc::clone(&self.ctx);
        let semaphore = Arc::clone(&self.job_semaphore);
        let id = job_id.clone();
        tokio::spawn(async move {
            match semaphore.acquire_owned().await {
                Ok(_permit) => pipeline::run_job(&ctx, id, clips, overlay).await,
                Err(_) => {
                    warn!(job_id = %id, "dispatcher shut down before job started");
                    let _ = ctx
                        .store
                        .update(&id, |j| j.fail("Worker shutting down"))
                        .await;
                }
            }
        });

        Ok(job_id)
    }

    /// Point-in-time copy of the job record.
    pub async fn status(&self, id: &JobId) -> WorkerResult<Job> {
        self.ctx.store.snapshot(id).await
    }

    /// Output path of a succeeded job.
    pub async fn result(&self, id: &JobId) -> WorkerResult<PathBuf> {
        let job = self.ctx.store.snapshot(id).await?;
        if job.status != JobStatus::Succeeded {
            return Err(WorkerError::ResultNotReady(id.clone()));
        }
        job.result_path
            .ok_or_else(|| WorkerError::ResultNotReady(id.clone()))
    }

    /// Stop accepting work. Jobs already holding a slot run to
    /// completion; jobs still waiting for one are failed.
    pub fn shutdown(&self) {
        info!("dispatcher shutting down");
        self.job_semaphore.close();
    }
}

//! Render pipeline: plan resolution, compilation, execution.
//!
//! One job flows through four stages: probe the staged clips, resolve
//! an edit plan through the AI service, compile the validated plan
//! into a single FFmpeg invocation, and run it. Any stage failing
//! fails the whole job; there are no partial outputs. Scratch files
//! are kept after a failure for diagnosis.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use liveedit_media::{compile, ClipInfo, ClipSource, MediaResult, Renderer};
use liveedit_models::{AudioOverlaySpec, JobId, ResolvedPlan, StagedAsset};
use liveedit_planner::{ClipMeta, PlanResolver};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::store::JobStore;

/// Clip metadata extraction, behind a seam so the pipeline can be
/// exercised without ffprobe on the machine.
#[async_trait]
pub trait ClipProber: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaResult<ClipInfo>;
}

/// Production prober backed by ffprobe.
pub struct FfprobeProber;

#[async_trait]
impl ClipProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> MediaResult<ClipInfo> {
        liveedit_media::probe_clip(path).await
    }
}

/// Everything a pipeline run needs, shared across jobs.
pub struct JobContext {
    pub config: WorkerConfig,
    pub store: JobStore,
    pub resolver: Arc<dyn PlanResolver>,
    pub prober: Arc<dyn ClipProber>,
    pub renderer: Arc<dyn Renderer>,
}

/// Execute one job to a terminal state.
///
/// Errors never escape: the job record ends up `Succeeded` with a
/// result path or `Failed` with a short diagnostic, and the full
/// error goes to the log.
pub async fn run_job(
    ctx: &JobContext,
    job_id: JobId,
    clips: Vec<StagedAsset>,
    overlay: Option<AudioOverlaySpec>,
) {
    match run_stages(ctx, &job_id, &clips, overlay.as_ref()).await {
        Ok(output) => {
            info!(job_id = %job_id, output = %output.display(), "job succeeded");
            let _ = ctx
                .store
                .update(&job_id, |j| j.succeed(output, "Render complete"))
                .await;
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "job failed");
            let _ = ctx.store.update(&job_id, |j| j.fail(e.user_message())).await;
        }
    }
}

async fn run_stages(
    ctx: &JobContext,
    job_id: &JobId,
    clips: &[StagedAsset],
    overlay: Option<&AudioOverlaySpec>,
) -> WorkerResult<std::path::PathBuf> {
    let instruction = ctx.store.snapshot(job_id).await?.instruction;

    ctx.store
        .update(job_id, |j| {
            j.start("Probing clips");
            j.set_stage(10, "Probing clips");
        })
        .await?;

    let mut sources = Vec::with_capacity(clips.len());
    for asset in clips {
        let info = ctx.prober.probe(&asset.path).await?;
        sources.push(ClipSource {
            asset: asset.clone(),
            info,
        });
    }

    ctx.store
        .update(job_id, |j| j.set_stage(20, "Resolving edit plan"))
        .await?;

    let metas: Vec<ClipMeta> = sources
        .iter()
        .map(|s| ClipMeta {
            name: s.asset.file_name(),
            duration_secs: Some(s.info.duration),
        })
        .collect();

    let plan = ctx.resolver.resolve_plan(&instruction, &metas).await?;
    let mut resolved = plan.resolve(sources.len(), ctx.config.max_clips)?;
    if let Some(spec) = overlay {
        merge_overlay_defaults(&mut resolved, spec);
    }

    ctx.store
        .update(job_id, |j| j.set_stage(60, "Rendering"))
        .await?;

    let scratch = liveedit_media::job_scratch_dir(&ctx.config.scratch_root, job_id).await?;
    let output = scratch.join("output.mp4");
    let command = compile(&sources, &resolved, overlay, None, &output);

    let rendered = ctx.renderer.render(&command).await?;
    Ok(rendered)
}

/// Reconcile plan-derived overlay timing with the enqueue request.
///
/// An explicit start offset in the request wins over whatever timing
/// the plan inferred, and the planner's zero-dB placeholder must not
/// shadow the ducking level the request asked for.
fn merge_overlay_defaults(resolved: &mut ResolvedPlan, spec: &AudioOverlaySpec) {
    if spec.start_secs != 0.0 {
        resolved.audio_start = None;
    }
    if resolved.audio_duck_db == Some(0.0) {
        resolved.audio_duck_db = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    use liveedit_media::{stage_bytes, FfmpegCommand, MediaError};
    use liveedit_models::{AssetKind, EditOperation, EditPlan, Job, JobKind, JobStatus};
    use liveedit_planner::{PlannerError, PlannerResult};

    struct ScriptedResolver {
        plan: Option<EditPlan>,
        calls: AtomicU32,
    }

    impl ScriptedResolver {
        fn ok(plan: EditPlan) -> Self {
            Self {
                plan: Some(plan),
                calls: AtomicU32::new(0),
            }
        }

        fn unavailable() -> Self {
            Self {
                plan: None,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PlanResolver for ScriptedResolver {
        async fn resolve_plan(
            &self,
            _instruction: &str,
            _clips: &[ClipMeta],
        ) -> PlannerResult<EditPlan> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.plan {
                Some(plan) => Ok(plan.clone()),
                None => Err(PlannerError::Exhausted {
                    attempts: 3,
                    last: Box::new(PlannerError::Api {
                        status: 503,
                        body: "overloaded".into(),
                    }),
                }),
            }
        }
    }

    struct FixedProber;

    #[async_trait]
    impl ClipProber for FixedProber {
        async fn probe(&self, _path: &Path) -> MediaResult<ClipInfo> {
            Ok(ClipInfo {
                duration: 10.0,
                width: 1280,
                height: 720,
                size: 1024,
            })
        }
    }

    struct ScriptedRenderer {
        fail: bool,
        calls: AtomicU32,
    }

    impl ScriptedRenderer {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn render(&self, cmd: &FfmpegCommand) -> MediaResult<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MediaError::ffmpeg_failed(
                    "ffmpeg exited with status 1",
                    Some("Invalid data found when processing input".to_string()),
                    Some(1),
                ));
            }
            tokio::fs::write(cmd.output_path(), b"rendered").await?;
            Ok(cmd.output_path().to_path_buf())
        }
    }

    async fn staged_job(
        scratch: &Path,
        resolver: Arc<dyn PlanResolver>,
        renderer: Arc<dyn Renderer>,
    ) -> (JobContext, JobId, Vec<StagedAsset>) {
        let ctx = JobContext {
            config: WorkerConfig {
                scratch_root: scratch.to_path_buf(),
                ..Default::default()
            },
            store: JobStore::new(),
            resolver,
            prober: Arc::new(FixedProber),
            renderer,
        };

        let job = Job::new(JobKind::MultiClipEdit, "reverse the clips");
        let job_id = job.id.clone();
        ctx.store.insert(job).await;

        let mut clips = Vec::new();
        for name in ["a.mp4", "b.mp4"] {
            let asset = stage_bytes(scratch, &job_id, name, b"fake video", AssetKind::Video)
                .await
                .unwrap();
            clips.push(asset);
        }

        (ctx, job_id, clips)
    }

    fn reverse_plan() -> EditPlan {
        EditPlan {
            operations: vec![EditOperation::Reorder { order: vec![1, 0] }],
        }
    }

    #[tokio::test]
    async fn test_happy_path_reaches_succeeded() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(ScriptedRenderer::new(false));
        let (ctx, job_id, clips) = staged_job(
            dir.path(),
            Arc::new(ScriptedResolver::ok(reverse_plan())),
            renderer.clone(),
        )
        .await;

        run_job(&ctx, job_id.clone(), clips, None).await;

        let job = ctx.store.snapshot(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.progress, 100);
        let output = job.result_path.unwrap();
        assert!(output.exists());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_resolver_fails_without_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(ScriptedRenderer::new(false));
        let (ctx, job_id, clips) = staged_job(
            dir.path(),
            Arc::new(ScriptedResolver::unavailable()),
            renderer.clone(),
        )
        .await;

        run_job(&ctx, job_id.clone(), clips, None).await;

        let job = ctx.store.snapshot(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.message.contains("unavailable"));
        assert!(job.result_path.is_none());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_render_failure_keeps_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, job_id, clips) = staged_job(
            dir.path(),
            Arc::new(ScriptedResolver::ok(reverse_plan())),
            Arc::new(ScriptedRenderer::new(true)),
        )
        .await;
        let staged_paths: Vec<PathBuf> = clips.iter().map(|c| c.path.clone()).collect();

        run_job(&ctx, job_id.clone(), clips, None).await;

        let job = ctx.store.snapshot(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.message.contains("Render failed"));
        assert!(job.result_path.is_none());
        for path in staged_paths {
            assert!(path.exists(), "scratch file {} was removed", path.display());
        }
    }

    #[tokio::test]
    async fn test_invalid_plan_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let plan = EditPlan {
            operations: vec![EditOperation::Trim {
                clip_index: 9,
                start: 0.0,
                end: None,
            }],
        };
        let (ctx, job_id, clips) = staged_job(
            dir.path(),
            Arc::new(ScriptedResolver::ok(plan)),
            Arc::new(ScriptedRenderer::new(false)),
        )
        .await;

        run_job(&ctx, job_id.clone(), clips, None).await;

        let job = ctx.store.snapshot(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.message.contains("Invalid edit plan"));
    }

    #[test]
    fn test_explicit_overlay_start_wins_over_plan() {
        let mut resolved = ResolvedPlan {
            audio_start: Some(3.0),
            audio_duck_db: Some(0.0),
            ..Default::default()
        };
        let spec = AudioOverlaySpec {
            asset: StagedAsset {
                job_id: JobId::new(),
                path: PathBuf::from("/tmp/x/music.mp3"),
                declared_size: 1,
                kind: AssetKind::Audio,
            },
            start_secs: 4.0,
            duck_db: -12.0,
        };

        merge_overlay_defaults(&mut resolved, &spec);
        assert_eq!(resolved.audio_start, None);
        assert_eq!(resolved.audio_duck_db, None);
    }

    #[test]
    fn test_plan_overlay_timing_kept_when_request_has_none() {
        let mut resolved = ResolvedPlan {
            audio_start: Some(3.0),
            audio_duck_db: Some(-6.0),
            ..Default::default()
        };
        let spec = AudioOverlaySpec {
            asset: StagedAsset {
                job_id: JobId::new(),
                path: PathBuf::from("/tmp/x/music.mp3"),
                declared_size: 1,
                kind: AssetKind::Audio,
            },
            start_secs: 0.0,
            duck_db: 0.0,
        };

        merge_overlay_defaults(&mut resolved, &spec);
        assert_eq!(resolved.audio_start, Some(3.0));
        assert_eq!(resolved.audio_duck_db, Some(-6.0));
    }
}

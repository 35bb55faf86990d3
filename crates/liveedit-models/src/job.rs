//! Job record and lifecycle state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of edit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// One clip, optional audio overlay
    SingleEdit,
    /// Up to the configured clip limit, concatenated per the edit plan
    MultiClipEdit,
}

/// Job lifecycle status.
///
/// `queued -> processing -> {succeeded | failed}`. Terminal states
/// accept no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting for a worker
    #[default]
    Queued,
    /// A worker is executing the pipeline
    Processing,
    /// Output rendered and verified
    Succeeded,
    /// Pipeline aborted with an unrecoverable error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal states are immutable once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One render request, as seen by status pollers.
///
/// Mutated only through the transition methods below; the store
/// guarantees a single writer per job id.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Kind of edit
    pub kind: JobKind,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Progress (0-100), non-decreasing while processing
    #[serde(default)]
    pub progress: u8,

    /// Human-readable current-stage description
    pub message: String,

    /// Natural-language edit instruction
    pub instruction: String,

    /// Output path, set only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new queued job.
    pub fn new(kind: JobKind, instruction: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            instruction: instruction.into(),
            result_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Begin processing. No-op if the job is already terminal.
    pub fn start(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Processing;
        self.message = message.into();
        self.updated_at = Utc::now();
    }

    /// Update stage progress and message.
    ///
    /// Progress is clamped so it never decreases; terminal jobs are
    /// left untouched.
    pub fn set_stage(&mut self, progress: u8, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.progress = progress.min(100).max(self.progress);
        self.message = message.into();
        self.updated_at = Utc::now();
    }

    /// Transition to succeeded, setting the result path atomically
    /// with the status.
    pub fn succeed(&mut self, result_path: PathBuf, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Succeeded;
        self.progress = 100;
        self.message = message.into();
        self.result_path = Some(result_path);
        self.updated_at = Utc::now();
    }

    /// Transition to failed with a short diagnostic message.
    ///
    /// `result_path` stays unset; scratch files remain for diagnosis.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.message = message.into();
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new(JobKind::MultiClipEdit, "reverse the clips");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.result_path.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_job_state_transitions() {
        let mut job = Job::new(JobKind::SingleEdit, "trim it");

        job.start("Resolving edit plan");
        assert_eq!(job.status, JobStatus::Processing);

        job.set_stage(20, "Resolving edit plan");
        assert_eq!(job.progress, 20);

        job.set_stage(60, "Rendering");
        assert_eq!(job.progress, 60);

        job.succeed(PathBuf::from("/tmp/out.mp4"), "Render complete");
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.progress, 100);
        assert!(job.result_path.is_some());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = Job::new(JobKind::MultiClipEdit, "x");
        job.start("go");
        job.set_stage(60, "Rendering");
        job.set_stage(20, "stale update");
        assert_eq!(job.progress, 60);
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        let mut job = Job::new(JobKind::MultiClipEdit, "x");
        job.start("go");
        job.fail("render failed");
        assert_eq!(job.status, JobStatus::Failed);

        job.start("again");
        job.set_stage(50, "half");
        job.succeed(PathBuf::from("/tmp/out.mp4"), "done");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result_path.is_none());
    }

    #[test]
    fn test_failed_job_keeps_result_unset() {
        let mut job = Job::new(JobKind::MultiClipEdit, "x");
        job.start("go");
        job.fail("ffmpeg exited with status 1");
        assert!(job.result_path.is_none());
        assert!(job.is_terminal());
    }
}

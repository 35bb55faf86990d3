//! Worker error types.

use thiserror::Error;

use liveedit_models::{JobId, PlanValidationError};

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors from the job lifecycle manager and the render pipeline.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("media error: {0}")]
    Media(#[from] liveedit_media::MediaError),

    #[error("planner error: {0}")]
    Planner(#[from] liveedit_planner::PlannerError),

    #[error("invalid edit plan: {0}")]
    Plan(#[from] PlanValidationError),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("job {0} has no result yet")]
    ResultNotReady(JobId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Short diagnostic for the job record. Raw subprocess output and
    /// upstream response bodies go to the log, never into the job
    /// message a poller sees.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::Media(liveedit_media::MediaError::FfmpegFailed { message, .. }) => {
                format!("Render failed: {}", message)
            }
            WorkerError::Media(liveedit_media::MediaError::Timeout(secs)) => {
                format!("Render timed out after {}s", secs)
            }
            WorkerError::Media(e) => format!("Media processing failed: {}", e),
            WorkerError::Planner(liveedit_planner::PlannerError::Exhausted {
                attempts, ..
            }) => format!("AI service unavailable after {} attempts", attempts),
            WorkerError::Planner(_) => "Failed to resolve an edit plan".to_string(),
            WorkerError::Plan(e) => format!("Invalid edit plan: {}", e),
            WorkerError::JobNotFound(id) => format!("Job {} not found", id),
            WorkerError::ResultNotReady(id) => format!("Job {} has no result yet", id),
            WorkerError::Io(_) => "Internal storage error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveedit_planner::PlannerError;

    #[test]
    fn test_exhausted_planner_message_names_unavailability() {
        let err = WorkerError::Planner(PlannerError::Exhausted {
            attempts: 3,
            last: Box::new(PlannerError::Api {
                status: 503,
                body: "overloaded".into(),
            }),
        });
        let msg = err.user_message();
        assert!(msg.contains("unavailable"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_render_failure_message_omits_stderr() {
        let err = WorkerError::Media(liveedit_media::MediaError::ffmpeg_failed(
            "ffmpeg exited with status 1",
            Some("very long stderr dump with codec internals".to_string()),
            Some(1),
        ));
        let msg = err.user_message();
        assert!(msg.contains("Render failed"));
        assert!(!msg.contains("stderr dump"));
    }
}

//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent render jobs
    pub max_concurrent_jobs: usize,
    /// Maximum clips accepted per job
    pub max_clips: usize,
    /// Scratch root for per-job working directories
    pub scratch_root: PathBuf,
    /// Timeout for a single render invocation
    pub render_timeout: Duration,
    /// Total AI-service attempts per plan resolution
    pub retry_max_attempts: u32,
    /// Delay before the first AI-service retry
    pub retry_initial_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_clips: 3,
            scratch_root: PathBuf::from("/tmp/liveedit_jobs"),
            render_timeout: Duration::from_secs(600),
            retry_max_attempts: 3,
            retry_initial_delay: Duration::from_secs(2),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("LIVEEDIT_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            max_clips: std::env::var("LIVEEDIT_MAX_CLIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            scratch_root: std::env::var("LIVEEDIT_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/liveedit_jobs")),
            render_timeout: Duration::from_secs(
                std::env::var("LIVEEDIT_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            retry_max_attempts: std::env::var("LIVEEDIT_RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_initial_delay: Duration::from_secs(
                std::env::var("LIVEEDIT_RETRY_INITIAL_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
        }
    }
}

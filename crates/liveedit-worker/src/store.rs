//! In-memory job store.
//!
//! The map lock is held only to look up or insert an entry; each job
//! carries its own lock, so a slow update on one job never blocks
//! status polls for another. All mutation goes through [`JobStore::update`],
//! and the job's own transition methods keep terminal states frozen.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use liveedit_models::{Job, JobId};

use crate::error::{WorkerError, WorkerResult};

/// Shared job store, cheap to clone across tasks.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Arc<RwLock<Job>>>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job record.
    pub async fn insert(&self, job: Job) {
        let id = job.id.clone();
        debug!(job_id = %id, "registered job");
        self.jobs
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(job)));
    }

    /// Point-in-time copy of a job record.
    pub async fn snapshot(&self, id: &JobId) -> WorkerResult<Job> {
        let entry = self.entry(id).await?;
        let job = entry.read().await;
        Ok(job.clone())
    }

    /// Apply a transition under the job's own write lock.
    ///
    /// The closure receives the live record; terminal jobs silently
    /// ignore transitions because the record's own methods refuse
    /// them.
    pub async fn update<F>(&self, id: &JobId, f: F) -> WorkerResult<()>
    where
        F: FnOnce(&mut Job),
    {
        let entry = self.entry(id).await?;
        let mut job = entry.write().await;
        if job.is_terminal() {
            debug!(job_id = %id, status = %job.status, "ignoring update to terminal job");
        }
        f(&mut job);
        Ok(())
    }

    async fn entry(&self, id: &JobId) -> WorkerResult<Arc<RwLock<Job>>> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| WorkerError::JobNotFound(id.clone()))
    }
}

//! Staged upload artifacts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::JobId;

/// Media kind of a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Video,
    Audio,
}

/// A file materialized on scratch storage for one job.
///
/// Constructed only by the artifact stager, after the written path
/// has passed an existence-and-size check. Downstream stages may
/// therefore assume the file is present and non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StagedAsset {
    /// Owning job
    pub job_id: JobId,
    /// Absolute path inside the job's scratch directory
    pub path: PathBuf,
    /// Size observed at staging time, in bytes
    pub declared_size: u64,
    /// Video clip or audio overlay
    pub kind: AssetKind,
}

impl StagedAsset {
    /// File name component, for prompt metadata and logs.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

//! Artifact staging.
//!
//! Uploads are written to a per-job scratch directory and verified
//! on disk before any downstream stage may reference them. The same
//! `verify_artifact` check guards the render executor's output, so a
//! consumer can never observe a path that is missing or zero bytes.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use liveedit_models::{AssetKind, JobId, StagedAsset};

use crate::error::{MediaError, MediaResult};

/// Per-job scratch directory under `scratch_root`, created if absent.
pub async fn job_scratch_dir(scratch_root: &Path, job_id: &JobId) -> MediaResult<PathBuf> {
    let dir = scratch_root.join(job_id.as_str());
    fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Write an uploaded file into the job's scratch directory and
/// return it as a staged asset.
///
/// The written path is re-checked for existence and non-zero size
/// before the asset is handed back. A failed check is fatal for the
/// job; a zero-byte write means the upload or the disk is broken,
/// not that a retry would help.
pub async fn stage_bytes(
    scratch_root: &Path,
    job_id: &JobId,
    file_name: &str,
    bytes: &[u8],
    kind: AssetKind,
) -> MediaResult<StagedAsset> {
    let dir = job_scratch_dir(scratch_root, job_id).await?;

    // Uploads must not escape the job directory
    let name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| MediaError::staging(format!("invalid upload name '{}'", file_name)))?;
    let path = dir.join(name);

    fs::write(&path, bytes).await?;

    let declared_size = verify_artifact(&path).await?;
    debug!(
        job_id = %job_id,
        path = %path.display(),
        size = declared_size,
        "staged upload"
    );

    Ok(StagedAsset {
        job_id: job_id.clone(),
        path,
        declared_size,
        kind,
    })
}

/// Confirm a path exists and is non-empty, returning its size.
pub async fn verify_artifact(path: &Path) -> MediaResult<u64> {
    let meta = match fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(MediaError::from(e)),
    };

    if meta.len() == 0 {
        return Err(MediaError::EmptyFile(path.to_path_buf()));
    }

    Ok(meta.len())
}

//! Render executor: spawns the compiled FFmpeg command.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::stage::verify_artifact;

/// Seam between the pipeline and the transcoding engine, so tests can
/// substitute a mock for the real subprocess.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Run the command to completion and return the verified output
    /// path.
    async fn render(&self, cmd: &FfmpegCommand) -> MediaResult<PathBuf>;
}

/// Runs FFmpeg as a subprocess with a bounded timeout, capturing
/// stderr verbatim as the sole diagnostic channel.
pub struct FfmpegRunner {
    timeout_secs: u64,
}

impl FfmpegRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    async fn wait_with_timeout(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!(
                    "ffmpeg exceeded {}s timeout, killing process",
                    self.timeout_secs
                );
                let _ = child.kill().await;
                Err(MediaError::Timeout(self.timeout_secs))
            }
        }
    }
}

#[async_trait]
impl Renderer for FfmpegRunner {
    async fn render(&self, cmd: &FfmpegCommand) -> MediaResult<PathBuf> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Collect stderr concurrently so a chatty encode cannot fill
        // the pipe and deadlock the child.
        let stderr = child.stderr.take().expect("stderr not captured");
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut captured = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                captured.push_str(&line);
                captured.push('\n');
            }
            captured
        });

        let status = self.wait_with_timeout(&mut child).await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with non-zero status",
                Some(stderr_output),
                status.code(),
            ));
        }

        // Same discipline as staging: the output must exist and be
        // non-empty before anyone may reference it.
        verify_artifact(cmd.output_path()).await?;
        Ok(cmd.output_path().to_path_buf())
    }
}

//! FFmpeg CLI wrapper for the LiveEdit render pipeline.
//!
//! This crate owns everything that touches the transcoding engine:
//! - artifact staging and the existence/size discipline (`stage`)
//! - ffprobe metadata extraction (`probe`)
//! - the edit-plan-to-filter-graph compiler (`filtergraph`)
//! - the command builder (`command`) and subprocess runner (`runner`)

pub mod command;
pub mod error;
pub mod filtergraph;
pub mod probe;
pub mod runner;
pub mod stage;

pub use command::FfmpegCommand;
pub use error::{MediaError, MediaResult};
pub use filtergraph::{compile, ClipSource, Resolution};
pub use probe::{probe_clip, ClipInfo};
pub use runner::{FfmpegRunner, Renderer};
pub use stage::{job_scratch_dir, stage_bytes, verify_artifact};

//! Shared data models for the LiveEdit backend.
//!
//! Everything that crosses a crate boundary lives here: the job
//! record and its state machine, staged assets, the edit plan types
//! produced by the AI resolver, and timestamp parsing.

pub mod asset;
pub mod job;
pub mod plan;
pub mod timestamp;

pub use asset::{AssetKind, StagedAsset};
pub use job::{Job, JobId, JobKind, JobStatus};
pub use plan::{
    AudioOverlaySpec, EditOperation, EditPlan, PlanValidationError, ResolvedClip, ResolvedPlan,
};

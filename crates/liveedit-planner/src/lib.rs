//! Edit-plan resolution against the external generative-AI service.
//!
//! `GeminiPlanner` sends clip metadata plus the user's instruction to
//! the Gemini API and converts the loosely-shaped JSON reply into the
//! tagged `EditOperation` variants from `liveedit-models`. Every
//! outbound call goes through the reusable `RetryPolicy`.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{ClipMeta, GeminiPlanner, PlanResolver};
pub use error::{PlannerError, PlannerResult};
pub use retry::{RetryClass, RetryFailure, RetryPolicy};

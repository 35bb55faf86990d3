//! Job lifecycle manager and render pipeline.
//!
//! The dispatcher accepts staged edit requests, tracks each job
//! through `queued -> processing -> {succeeded | failed}`, and runs
//! the pipeline (probe, plan resolution, filter-graph compilation,
//! render) on a bounded task pool.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod store;

pub use config::WorkerConfig;
pub use dispatcher::JobDispatcher;
pub use error::{WorkerError, WorkerResult};
pub use pipeline::{ClipProber, FfprobeProber, JobContext};
pub use store::JobStore;

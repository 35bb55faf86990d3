//! Video edit worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liveedit_media::FfmpegRunner;
use liveedit_planner::{GeminiPlanner, RetryPolicy};
use liveedit_worker::{FfprobeProber, JobDispatcher, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("liveedit=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting liveedit-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let retry = RetryPolicy::new("gemini_resolve_plan")
        .with_max_attempts(config.retry_max_attempts)
        .with_initial_delay(config.retry_initial_delay);

    let planner = match GeminiPlanner::from_env() {
        Ok(p) => p.with_retry(retry),
        Err(e) => {
            error!("Failed to create planner: {}", e);
            std::process::exit(1);
        }
    };

    let renderer = FfmpegRunner::new(config.render_timeout.as_secs());

    let dispatcher = JobDispatcher::new(
        config,
        Arc::new(planner),
        Arc::new(FfprobeProber),
        Arc::new(renderer),
    );

    // Run until interrupted; requests arrive through the dispatcher
    // embedded by the serving layer.
    tokio::signal::ctrl_c().await.ok();
    info!("Received shutdown signal");

    dispatcher.shutdown();
    info!("Worker shutdown complete");
}

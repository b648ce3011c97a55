//! Textual Flow Binary
//!
//! Draws textual flow diagrams for the configured variant units from a
//! SQLite CBGM database.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `FLOW_DATABASE_URL`: SQLite connection string (required)
//! - `FLOW_VARIANT_UNITS`: comma-separated units, or `all` (required)
//! - `FLOW_CONNECTIVITY`: comma-separated thresholds (default: 499)
//! - `FLOW_WORKERS`: worker count, 0 for direct mode (default: 0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! See `textual_flow::config` for the full list.
//!
//! ## Usage
//!
//! ```bash
//! FLOW_DATABASE_URL=sqlite://cbgm.db FLOW_VARIANT_UNITS=all FLOW_CONNECTIVITY=5,10,499 \
//!     cargo run --bin textual_flow --features sqlite
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use textual_flow::{
    FlowConfig, FsArtifactStore, SqliteCoherenceProvider, SqliteConfig, SqliteWitnessSource, TextualFlow,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "textual_flow=info,sqlx=warn".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match FlowConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let db = match SqliteConfig::from_env() {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Invalid database configuration");
            return ExitCode::FAILURE;
        }
    };
    let pool = match db.connect().await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, database_url = %db.database_url, "Failed to open database");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        error!(error = %e, path = %config.output_dir.display(), "Failed to create output directory");
        return ExitCode::FAILURE;
    }

    let provider = Arc::new(SqliteCoherenceProvider::new(pool.clone()));
    let runner = TextualFlow::new(
        SqliteWitnessSource::new(pool),
        config.dispatcher(provider),
        config.renderer(),
        Box::new(FsArtifactStore::new(config.output_dir.clone())),
    );

    info!(
        thresholds = config.thresholds.len(),
        workers = config.workers,
        output_dir = %config.output_dir.display(),
        "Textual flow starting"
    );

    match runner.run(&config.request()).await {
        Ok(summary) => {
            for (unit, witnesses) in &summary.failed_witnesses {
                error!(unit = %unit, count = witnesses.len(), "Witnesses without resolved parents");
            }
            if summary.error_count() > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "Textual flow run failed");
            ExitCode::FAILURE
        }
    }
}

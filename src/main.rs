//! law-tracker service entrypoint.
//! Loads config and sources, builds the pipeline and serves the HTTP API.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use law_tracker::config::TrackerConfig;
use law_tracker::ingest::{config::load_sources_default, fetch::Fetcher};
use law_tracker::metrics::Metrics;
use law_tracker::{router, AppState, Pipeline};

/// `RUST_LOG` filter (default `law_tracker=info,warn`); JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("law_tracker=info,pipeline=info,ingest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may already have installed a global subscriber.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = TrackerConfig::load_default().context("loading tracker config")?;
    let registry = load_sources_default().context("loading source list")?;
    let fetcher = Fetcher::from_settings(cfg.fetch.clone()).context("building http client")?;
    let pipeline = Pipeline::new(fetcher, cfg.pipeline.clone());
    info!(
        sources = registry.len(),
        batch_size = cfg.pipeline.batch_size,
        deadline_ms = cfg.pipeline.deadline_ms,
        "law-tracker starting"
    );

    let metrics = Metrics::init()?;
    let app = router(AppState::new(registry, pipeline)).merge(metrics.router());

    Ok(app.into())
}

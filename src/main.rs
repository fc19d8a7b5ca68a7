//! Sports Digest Curator: binary entrypoint
//! Boots the Axum HTTP server: config, provider cascade, metrics and routes.
//!
//! See `README.md` for the request shapes and `DESIGN.md` for architecture notes.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sports_digest_curator::api::{self, AppState};
use sports_digest_curator::metrics::Metrics;
use sports_digest_curator::{Curator, CuratorConfig};

const DEV_LOG_ENV: &str = "CURATOR_DEV_LOG";
const DEFAULT_LOG_FILTER: &str = "curator=info,sports_digest_curator=info,warn";

/// Local runs only: a debug build or a local Shuttle env, with CURATOR_DEV_LOG=1.
fn dev_logging_requested() -> bool {
    if std::env::var(DEV_LOG_ENV).as_deref() != Ok("1") {
        return false;
    }
    let shuttle_env = std::env::var("SHUTTLE_ENV").unwrap_or_default();
    cfg!(debug_assertions)
        || ["local", "development", "dev"]
            .iter()
            .any(|e| shuttle_env.eq_ignore_ascii_case(e))
}

fn init_dev_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // Picks up ANTHROPIC_API_KEY / PERPLEXITY_API_KEY / CURATOR_CONFIG_PATH.
    let _ = dotenvy::dotenv();

    if dev_logging_requested() {
        init_dev_tracing();
    }

    let cfg = CuratorConfig::load_default()?;
    let metrics = Metrics::init(&cfg.generation)?;

    let curator = Arc::new(Curator::from_config(&cfg));
    tracing::info!(
        target: "curator",
        providers = ?curator.provider_kinds(),
        min_items = cfg.generation.min_items,
        max_items = cfg.generation.max_items,
        "curator ready"
    );

    let state = AppState::new(curator, cfg.generation);
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}

// src/metrics.rs
use anyhow::Context;
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shuttle_axum::axum::{extract::State, routing::get, Router};

use crate::config::GenerationDefaults;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the configured cascade thresholds.
    pub fn init(defaults: &GenerationDefaults) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("curator_min_items").set(defaults.min_items as f64);
        gauge!("curator_max_items").set(defaults.max_items as f64);
        gauge!("curator_provider_timeout_secs").set(defaults.provider_timeout_secs as f64);

        Ok(Self { handle })
    }

    /// `GET /metrics` rendered by the installed recorder.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render))
            .with_state(self.handle.clone())
    }
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

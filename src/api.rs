// src/api.rs
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use shuttle_axum::axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::config::{GenerationConfig, GenerationDefaults, MAX_ITEMS_LIMIT};
use crate::curator::digest::Digest;
use crate::curator::error::{GenerateError, ProviderError};
use crate::curator::types::{Interest, ProviderKind};
use crate::curator::{Curator, ProbeReport};

#[derive(Clone)]
pub struct AppState {
    curator: Arc<Curator>,
    defaults: GenerationDefaults,
}

impl AppState {
    pub fn new(curator: Arc<Curator>, defaults: GenerationDefaults) -> Self {
        Self { curator, defaults }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/digest", post(generate_digest))
        .route("/digest/{provider}", post(generate_with_provider))
        .route("/debug/providers", post(debug_providers))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct DigestReq {
    interests: Vec<Interest>,
    #[serde(default)]
    min_items: Option<usize>,
    #[serde(default)]
    max_items: Option<usize>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl DigestReq {
    /// Request overrides on top of the configured defaults.
    fn generation_config(&self, d: &GenerationDefaults, cancel: CancellationToken) -> GenerationConfig {
        let max_items = self
            .max_items
            .filter(|&n| n > 0)
            .unwrap_or(d.max_items)
            .min(MAX_ITEMS_LIMIT);
        GenerationConfig {
            min_items: self.min_items.unwrap_or(d.min_items).min(max_items),
            max_items,
            provider_timeout: Duration::from_secs(
                self.timeout_secs.filter(|&s| s > 0).unwrap_or(d.provider_timeout_secs),
            ),
            cancel,
        }
    }
}

pub enum ApiError {
    UnknownProvider(String),
    Generate(GenerateError),
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        ApiError::Generate(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, msg) = match self {
            ApiError::UnknownProvider(p) => (
                StatusCode::NOT_FOUND,
                "unknown_provider",
                format!("unknown provider '{p}'"),
            ),
            ApiError::Generate(GenerateError::Cancelled) => (
                // Client closed request; nobody is usually listening any more.
                StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
                "cancelled",
                "digest generation cancelled".to_string(),
            ),
            ApiError::Generate(GenerateError::Provider(e)) => {
                let status = match &e {
                    ProviderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    ProviderError::Upstream(_) => StatusCode::BAD_GATEWAY,
                    ProviderError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, e.kind().as_str(), e.to_string())
            }
        };
        (status, Json(json!({ "error": msg, "kind": kind }))).into_response()
    }
}

/// Dropping the handler future (client went away) cancels the run via the guard.
async fn generate_digest(
    State(state): State<AppState>,
    Json(body): Json<DigestReq>,
) -> Result<Json<Digest>, ApiError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let cfg = body.generation_config(&state.defaults, cancel);
    let digest = state.curator.generate(&body.interests, &cfg).await?;
    Ok(Json(digest))
}

async fn generate_with_provider(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(body): Json<DigestReq>,
) -> Result<Json<Digest>, ApiError> {
    let kind = ProviderKind::parse(&provider).ok_or(ApiError::UnknownProvider(provider))?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let cfg = body.generation_config(&state.defaults, cancel);
    let digest = state
        .curator
        .generate_with_provider(kind, &body.interests, &cfg)
        .await?;
    Ok(Json(digest))
}

async fn debug_providers(
    State(state): State<AppState>,
    Json(body): Json<DigestReq>,
) -> Result<Json<ProbeReport>, ApiError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let cfg = body.generation_config(&state.defaults, cancel);
    let report = state.curator.probe(&body.interests, &cfg).await?;
    Ok(Json(report))
}

// src/curator/mod.rs
//! Content acquisition orchestrator.
//!
//! One `generate` call walks the providers in priority order, one at a time:
//! primary, then secondary, then tertiary. After each attempt the number of valid
//! items collected so far is compared with `min_items`; once reached, the cascade
//! stops. Provider failures are logged and skipped. Only cancellation aborts a run.

pub mod dedup;
pub mod digest;
pub mod error;
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{CuratorConfig, GenerationConfig};
use dedup::dedup_and_rank;
use digest::{assemble, AttemptOutcome, Digest, ProviderAttempt};
use error::{GenerateError, ProviderError, ProviderErrorKind};
use types::{normalize_interests, ContentItem, ContentProvider, FetchOptions, Interest, ProviderKind};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "curator_provider_attempts_total",
            "Adapter attempts made by the fallback cascade."
        );
        describe_counter!(
            "curator_provider_errors_total",
            "Adapter attempts that failed, by error kind."
        );
        describe_counter!(
            "curator_items_invalid_total",
            "Items dropped before dedup for a missing title or non-absolute URL."
        );
        describe_counter!(
            "curator_dedup_removed_total",
            "Items collapsed as duplicates of a higher-ranked item."
        );
        describe_counter!("curator_digests_total", "Digests produced, by degraded flag.");
        describe_histogram!("curator_provider_fetch_ms", "Adapter call latency in milliseconds.");
        describe_histogram!("curator_feed_parse_ms", "RSS feed parse time in milliseconds.");
    });
}

/// Drop items that would not survive as digest entries.
fn retain_valid(items: Vec<ContentItem>, provider: &'static str) -> Vec<ContentItem> {
    let before = items.len();
    let valid: Vec<ContentItem> = items.into_iter().filter(ContentItem::is_valid).collect();
    let dropped = before - valid.len();
    if dropped > 0 {
        warn!(target: "curator", provider, dropped, "dropping invalid items");
        counter!("curator_items_invalid_total", "provider" => provider).increment(dropped as u64);
    }
    valid
}

/// Per-provider diagnostics from [`Curator::probe`].
#[derive(Debug, Clone, Serialize)]
pub struct ProviderProbe {
    pub provider: ProviderKind,
    pub backend: &'static str,
    pub success: bool,
    pub items_count: usize,
    pub error_kind: Option<ProviderErrorKind>,
    pub error: Option<String>,
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub providers_available: Vec<ProviderKind>,
    pub results: Vec<ProviderProbe>,
    /// Highest-priority provider that alone meets `min_items`.
    pub recommendation: Option<ProviderKind>,
}

/// Holds read-only adapters; safe to share across concurrent `generate` calls.
pub struct Curator {
    providers: Vec<Arc<dyn ContentProvider>>,
}

impl Curator {
    /// Providers are ordered by their tier regardless of the order given.
    pub fn new(mut providers: Vec<Arc<dyn ContentProvider>>) -> Self {
        providers.sort_by_key(|p| p.kind());
        Self { providers }
    }

    pub fn from_config(cfg: &CuratorConfig) -> Self {
        Self::new(providers::build_default_providers(cfg))
    }

    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// One bounded, cancellable adapter call. The outer `Result` only carries cancellation.
    async fn attempt(
        provider: &dyn ContentProvider,
        interests: &[Interest],
        config: &GenerationConfig,
    ) -> Result<Result<Vec<ContentItem>, ProviderError>, GenerateError> {
        if config.cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        let opts = FetchOptions {
            target_items: config.max_items,
            timeout: config.provider_timeout,
            cancel: config.cancel.child_token(),
        };
        counter!("curator_provider_attempts_total", "provider" => provider.name()).increment(1);
        let t0 = Instant::now();

        let res = tokio::select! {
            biased;
            _ = config.cancel.cancelled() => {
                info!(target: "curator", provider = provider.name(), "cancelled during provider call");
                return Err(GenerateError::Cancelled);
            }
            r = tokio::time::timeout(config.provider_timeout, provider.fetch(interests, &opts)) => {
                r.unwrap_or(Err(ProviderError::Timeout(config.provider_timeout)))
            }
        };

        histogram!("curator_provider_fetch_ms", "provider" => provider.name())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        if let Err(e) = &res {
            counter!(
                "curator_provider_errors_total",
                "provider" => provider.name(),
                "kind" => e.kind().as_str()
            )
            .increment(1);
        }
        Ok(res)
    }

    /// Run the fallback cascade and assemble a digest.
    ///
    /// Never fails because of providers: exhausting every tier yields a degraded
    /// (possibly empty) digest. Returns `GenerateError::Cancelled` if `config.cancel`
    /// fires before the digest is assembled.
    pub async fn generate(
        &self,
        interests: &[Interest],
        config: &GenerationConfig,
    ) -> Result<Digest, GenerateError> {
        ensure_metrics_described();
        let interests = normalize_interests(interests);
        let names: Vec<String> = interests.iter().map(|i| i.name.clone()).collect();

        let mut collected: Vec<ContentItem> = Vec::new();
        let mut attempts: Vec<ProviderAttempt> = Vec::new();

        if interests.is_empty() {
            info!(target: "curator", "no usable interests; returning empty digest");
        } else {
            for provider in &self.providers {
                match Self::attempt(provider.as_ref(), &interests, config).await? {
                    Ok(items) => {
                        let valid = retain_valid(items, provider.name());
                        info!(
                            target: "curator",
                            provider = provider.name(),
                            count = valid.len(),
                            "provider returned items"
                        );
                        attempts.push(ProviderAttempt {
                            provider: provider.kind(),
                            outcome: AttemptOutcome::Items { count: valid.len() },
                        });
                        collected.extend(valid);
                    }
                    Err(e) => {
                        warn!(
                            target: "curator",
                            provider = provider.name(),
                            kind = e.kind().as_str(),
                            error = %e,
                            "provider failed; falling back"
                        );
                        attempts.push(ProviderAttempt {
                            provider: provider.kind(),
                            outcome: AttemptOutcome::Failed {
                                kind: e.kind(),
                                message: e.to_string(),
                            },
                        });
                    }
                }

                if collected.len() >= config.min_items {
                    break;
                }
            }
        }

        if config.cancel.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }

        let digest = self.finish(collected, names, attempts, config);
        info!(
            target: "curator",
            items = digest.items.len(),
            degraded = digest.degraded,
            providers = ?digest.providers_used,
            "digest assembled"
        );
        Ok(digest)
    }

    /// Run exactly one provider, without fallback. Provider errors are returned.
    pub async fn generate_with_provider(
        &self,
        kind: ProviderKind,
        interests: &[Interest],
        config: &GenerationConfig,
    ) -> Result<Digest, GenerateError> {
        ensure_metrics_described();
        let provider = self
            .providers
            .iter()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| ProviderError::Unavailable(format!("{} provider not configured", kind.as_str())))?;

        let interests = normalize_interests(interests);
        let names: Vec<String> = interests.iter().map(|i| i.name.clone()).collect();
        if interests.is_empty() {
            return Ok(self.finish(Vec::new(), names, Vec::new(), config));
        }

        let items = Self::attempt(provider.as_ref(), &interests, config).await??;
        let valid = retain_valid(items, provider.name());
        let attempts = vec![ProviderAttempt {
            provider: kind,
            outcome: AttemptOutcome::Items { count: valid.len() },
        }];
        Ok(self.finish(valid, names, attempts, config))
    }

    /// Diagnostics: call every provider independently and report what each returned.
    pub async fn probe(
        &self,
        interests: &[Interest],
        config: &GenerationConfig,
    ) -> Result<ProbeReport, GenerateError> {
        ensure_metrics_described();
        let interests = normalize_interests(interests);
        if interests.is_empty() {
            info!(target: "curator", "no usable interests; nothing to diagnose");
            return Ok(ProbeReport {
                providers_available: self.provider_kinds(),
                results: Vec::new(),
                recommendation: None,
            });
        }
        let mut results = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let probe = match Self::attempt(provider.as_ref(), &interests, config).await? {
                Ok(items) => {
                    let items = retain_valid(items, provider.name());
                    ProviderProbe {
                        provider: provider.kind(),
                        backend: provider.name(),
                        success: true,
                        items_count: items.len(),
                        error_kind: None,
                        error: None,
                        items,
                    }
                }
                Err(e) => ProviderProbe {
                    provider: provider.kind(),
                    backend: provider.name(),
                    success: false,
                    items_count: 0,
                    error_kind: Some(e.kind()),
                    error: Some(e.to_string()),
                    items: Vec::new(),
                },
            };
            results.push(probe);
        }

        let recommendation = results
            .iter()
            .find(|r| r.success && r.items_count >= config.min_items)
            .map(|r| r.provider);

        Ok(ProbeReport {
            providers_available: self.provider_kinds(),
            results,
            recommendation,
        })
    }

    fn finish(
        &self,
        collected: Vec<ContentItem>,
        names: Vec<String>,
        attempts: Vec<ProviderAttempt>,
        config: &GenerationConfig,
    ) -> Digest {
        let before = collected.len();
        let mut ranked = dedup_and_rank(collected, usize::MAX);
        let removed = before - ranked.len();
        if removed > 0 {
            counter!("curator_dedup_removed_total").increment(removed as u64);
        }
        ranked.truncate(config.max_items);

        let digest = assemble(ranked, names, attempts, config.min_items, Utc::now());
        counter!("curator_digests_total", "degraded" => if digest.degraded { "true" } else { "false" })
            .increment(1);
        digest
    }
}

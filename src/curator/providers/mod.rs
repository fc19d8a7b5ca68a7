// src/curator/providers/mod.rs
pub mod claude;
pub mod espn_rss;
pub mod parsing;
pub mod perplexity;

use std::sync::Arc;

use crate::config::CuratorConfig;
use crate::curator::types::ContentProvider;

pub use claude::ClaudeProvider;
pub use espn_rss::EspnRssProvider;
pub use perplexity::PerplexityProvider;

/// The production cascade in priority order. Each adapter gets its own copy of
/// its settings; nothing is shared or mutated afterwards.
pub fn build_default_providers(cfg: &CuratorConfig) -> Vec<Arc<dyn ContentProvider>> {
    let timeout = cfg.http_timeout();
    vec![
        Arc::new(ClaudeProvider::new(cfg.anthropic.clone(), cfg.max_content_age_days, timeout)),
        Arc::new(PerplexityProvider::new(cfg.perplexity.clone(), cfg.max_content_age_days, timeout)),
        Arc::new(EspnRssProvider::from_settings(cfg.feeds.clone(), timeout)),
    ]
}

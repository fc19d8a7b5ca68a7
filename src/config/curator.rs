// src/config/curator.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{env, fs, path::Path, path::PathBuf};

use tokio_util::sync::CancellationToken;

pub const ENV_CONFIG_PATH: &str = "CURATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/curator.toml";

/// Upper bound on digest size, from config or per request.
pub const MAX_ITEMS_LIMIT: usize = 50;

const ENV_ANTHROPIC_KEY: &str = "ANTHROPIC_API_KEY";
const ENV_PERPLEXITY_KEY: &str = "PERPLEXITY_API_KEY";

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_search_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}
fn default_verify_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_perplexity_base_url() -> String {
    "https://api.perplexity.ai".to_string()
}
fn default_perplexity_model() -> String {
    "sonar".to_string()
}
fn default_max_entries_per_feed() -> usize {
    20
}
fn default_min_items() -> usize {
    3
}
fn default_max_items() -> usize {
    7
}
fn default_provider_timeout_secs() -> u64 {
    60
}
fn default_max_content_age_days() -> i64 {
    10
}
fn default_http_timeout_secs() -> u64 {
    45
}

/// Settings for the primary (Anthropic web-search) adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicSettings {
    /// "ENV" or empty means: read from ANTHROPIC_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_search_model")]
    pub search_model: String,
    #[serde(default = "default_verify_model")]
    pub verify_model: String,
    /// Second-stage relevance verification.
    #[serde(default = "default_true")]
    pub verify: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_anthropic_base_url(),
            search_model: default_search_model(),
            verify_model: default_verify_model(),
            verify: true,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Settings for the secondary (Perplexity) adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerplexitySettings {
    /// "ENV" or empty means: read from PERPLEXITY_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_perplexity_base_url")]
    pub base_url: String,
    #[serde(default = "default_perplexity_model")]
    pub model: String,
}

impl Default for PerplexitySettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_perplexity_base_url(),
            model: default_perplexity_model(),
        }
    }
}

/// Settings for the tertiary feed adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Feed name ("general", "nfl", ...) -> RSS URL.
    #[serde(default = "default_feed_urls")]
    pub urls: BTreeMap<String, String>,
    #[serde(default = "default_max_entries_per_feed")]
    pub max_entries_per_feed: usize,
}

pub fn default_feed_urls() -> BTreeMap<String, String> {
    [
        ("general", "https://www.espn.com/espn/rss/news"),
        ("nfl", "https://www.espn.com/espn/rss/nfl/news"),
        ("nba", "https://www.espn.com/espn/rss/nba/news"),
        ("mlb", "https://www.espn.com/espn/rss/mlb/news"),
        ("nhl", "https://www.espn.com/espn/rss/nhl/news"),
        ("soccer", "https://www.espn.com/espn/rss/soccer/news"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            urls: default_feed_urls(),
            max_entries_per_feed: default_max_entries_per_feed(),
        }
    }
}

/// Defaults for each generation run (`[generation]` table).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationDefaults {
    #[serde(default = "default_min_items")]
    pub min_items: usize,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            min_items: default_min_items(),
            max_items: default_max_items(),
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorConfig {
    #[serde(default)]
    pub anthropic: AnthropicSettings,
    #[serde(default)]
    pub perplexity: PerplexitySettings,
    #[serde(default)]
    pub feeds: FeedSettings,
    #[serde(default)]
    pub generation: GenerationDefaults,
    #[serde(default = "default_max_content_age_days")]
    pub max_content_age_days: i64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            anthropic: AnthropicSettings::default(),
            perplexity: PerplexitySettings::default(),
            feeds: FeedSettings::default(),
            generation: GenerationDefaults::default(),
            max_content_age_days: default_max_content_age_days(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl CuratorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading curator config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: CuratorConfig = toml::from_str(s).context("parsing curator config toml")?;
        cfg.resolve_env_keys();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Lookup order:
    /// 1) $CURATOR_CONFIG_PATH (must exist)
    /// 2) config/curator.toml
    /// 3) built-in defaults (keys still resolved from env)
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = Self::default();
        cfg.resolve_env_keys();
        Ok(cfg)
    }

    /// "ENV" or an empty key is read from the environment. A missing variable leaves
    /// the key empty; the adapter then reports itself unavailable.
    fn resolve_env_keys(&mut self) {
        fn resolve(key: &mut String, var: &str) {
            let t = key.trim();
            if t.is_empty() || t.eq_ignore_ascii_case("env") {
                *key = env::var(var).unwrap_or_default().trim().to_string();
            }
        }
        resolve(&mut self.anthropic.api_key, ENV_ANTHROPIC_KEY);
        resolve(&mut self.perplexity.api_key, ENV_PERPLEXITY_KEY);
    }

    fn sanitize(&mut self) {
        let g = &mut self.generation;
        if g.max_items == 0 {
            g.max_items = default_max_items();
        }
        g.max_items = g.max_items.min(MAX_ITEMS_LIMIT);
        if g.min_items > g.max_items {
            g.min_items = g.max_items;
        }
        if g.provider_timeout_secs == 0 {
            g.provider_timeout_secs = default_provider_timeout_secs();
        }
        if self.max_content_age_days <= 0 {
            self.max_content_age_days = default_max_content_age_days();
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_http_timeout_secs();
        }
        self.feeds
            .urls
            .retain(|name, url| !name.trim().is_empty() && !url.trim().is_empty());
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Fresh per-run config using the configured defaults and a new cancel token.
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            min_items: self.generation.min_items,
            max_items: self.generation.max_items,
            provider_timeout: Duration::from_secs(self.generation.provider_timeout_secs),
            cancel: CancellationToken::new(),
        }
    }
}

/// Per-call knobs for `Curator::generate`.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Quality gate: stop the cascade once this many valid items are collected.
    pub min_items: usize,
    pub max_items: usize,
    /// Budget for each adapter attempt.
    pub provider_timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let d = GenerationDefaults::default();
        Self {
            min_items: d.min_items,
            max_items: d.max_items,
            provider_timeout: Duration::from_secs(d.provider_timeout_secs),
            cancel: CancellationToken::new(),
        }
    }
}

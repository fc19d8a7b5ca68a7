// src/curator/types.rs
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::curator::error::ProviderError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InterestKind {
    Team,
    Athlete,
    Custom,
}

/// Optional attributes adapters may use to refine their queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestMetadata {
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub external_ids: BTreeMap<String, String>,
}

/// A user-selected team, athlete or free-text topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interest {
    #[serde(rename = "type")]
    pub kind: InterestKind,
    pub name: String,
    #[serde(default)]
    pub metadata: InterestMetadata,
}

impl Interest {
    pub fn new(kind: InterestKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            metadata: InterestMetadata::default(),
        }
    }

    pub fn team(name: impl Into<String>) -> Self {
        Self::new(InterestKind::Team, name)
    }

    pub fn athlete(name: impl Into<String>) -> Self {
        Self::new(InterestKind::Athlete, name)
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(InterestKind::Custom, name)
    }

    pub fn with_sport(mut self, sport: impl Into<String>) -> Self {
        self.metadata.sport = Some(sport.into());
        self
    }

    pub fn with_league(mut self, league: impl Into<String>) -> Self {
        self.metadata.league = Some(league.into());
        self
    }
}

/// Trim names, drop empty ones and drop case-insensitive duplicates (first wins).
pub fn normalize_interests(interests: &[Interest]) -> Vec<Interest> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(interests.len());
    for it in interests {
        let name = it.name.trim();
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            continue;
        }
        let mut it = it.clone();
        it.name = name.to_string();
        out.push(it);
    }
    out
}

/// Provider tiers. Declaration order is priority order: `Primary < Secondary < Tertiary`
/// under `Ord`, so sorting ascending puts the most trusted provider first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Primary,
    Secondary,
    Tertiary,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Primary,
        ProviderKind::Secondary,
        ProviderKind::Tertiary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Primary => "primary",
            ProviderKind::Secondary => "secondary",
            ProviderKind::Tertiary => "tertiary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "claude" => Some(ProviderKind::Primary),
            "secondary" | "perplexity" => Some(ProviderKind::Secondary),
            "tertiary" | "rss" | "feed" => Some(ProviderKind::Tertiary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Article,
    SocialPost,
    Video,
    Highlight,
}

impl SourceType {
    /// Map the loose labels AI backends return ("tweet", "reddit", ...) onto our enum.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "tweet" | "reddit" | "social" | "social_post" | "post" => SourceType::SocialPost,
            "video" | "youtube" => SourceType::Video,
            "highlight" | "highlights" => SourceType::Highlight,
            _ => SourceType::Article,
        }
    }
}

/// One normalized piece of sourced content, whatever backend produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub source_type: SourceType,
    #[serde(default)]
    pub related_interest: Option<String>,
    pub provider: ProviderKind,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub author_handle: Option<String>,
    #[serde(default)]
    pub relevance_note: Option<String>,
}

impl ContentItem {
    /// Minimal constructor; optional fields start empty.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source_type: SourceType,
        provider: ProviderKind,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: None,
            source_type,
            related_interest: None,
            provider,
            published_at: None,
            source_name: None,
            thumbnail_url: None,
            author_handle: None,
            relevance_note: None,
        }
    }

    /// Required fields present and `url` is an absolute URL with a host.
    pub fn is_valid(&self) -> bool {
        if self.title.trim().is_empty() {
            return false;
        }
        match url::Url::parse(self.url.trim()) {
            Ok(u) => u.has_host() && matches!(u.scheme(), "http" | "https"),
            Err(_) => false,
        }
    }
}

/// Per-call knobs handed to each adapter by the orchestrator.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub target_items: usize,
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            target_items: 7,
            timeout: Duration::from_secs(60),
            cancel: CancellationToken::new(),
        }
    }
}

/// Capability shared by every content backend.
///
/// Adapters must classify every failure into one of the [`ProviderError`] kinds,
/// must not keep state between calls, and skip interest kinds they cannot serve.
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch(
        &self,
        interests: &[Interest],
        opts: &FetchOptions,
    ) -> Result<Vec<ContentItem>, ProviderError>;

    fn kind(&self) -> ProviderKind;

    /// Backend name for logs and metrics labels.
    fn name(&self) -> &'static str;
}

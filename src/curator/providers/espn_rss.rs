// src/curator/providers/espn_rss.rs
//! Tertiary adapter: ESPN syndicated feeds filtered by interest keywords.
//! Needs no credentials, so it is always available as the last resort.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::config::curator::default_feed_urls;
use crate::config::FeedSettings;
use crate::curator::dedup::normalize_url;
use crate::curator::error::ProviderError;
use crate::curator::providers::parsing::{normalize_text, truncate_chars};
use crate::curator::types::{
    ContentItem, ContentProvider, FetchOptions, Interest, InterestKind, ProviderKind, SourceType,
};

const GENERAL_FEED: &str = "general";
const SUMMARY_MAX_CHARS: usize = 200;

/// Keywords that route an interest to a sport-specific feed.
const SPORT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "nfl",
        &[
            "nfl", "football", "patriots", "cowboys", "packers", "chiefs", "49ers", "eagles",
            "bills", "dolphins", "jets", "ravens", "steelers", "bengals", "browns", "texans",
            "colts", "jaguars", "titans", "broncos", "chargers", "raiders", "seahawks",
            "cardinals", "rams", "saints", "buccaneers", "falcons", "panthers", "bears", "lions",
            "vikings", "commanders", "giants", "mahomes", "burrow", "allen",
        ],
    ),
    (
        "nba",
        &[
            "nba", "basketball", "lakers", "celtics", "warriors", "nets", "knicks", "bulls",
            "heat", "bucks", "suns", "clippers", "mavericks", "nuggets", "76ers", "grizzlies",
            "timberwolves", "pelicans", "kings", "thunder", "lebron", "curry", "durant",
            "giannis", "jokic", "doncic", "tatum", "embiid",
        ],
    ),
    (
        "mlb",
        &[
            "mlb", "baseball", "yankees", "red sox", "dodgers", "cubs", "astros", "braves",
            "mets", "phillies", "padres", "mariners", "cardinals", "giants", "rangers", "angels",
            "tigers", "twins", "rays", "brewers", "ohtani", "trout", "judge",
        ],
    ),
    (
        "nhl",
        &[
            "nhl", "hockey", "bruins", "rangers", "maple leafs", "canadiens", "blackhawks",
            "penguins", "capitals", "red wings", "flyers", "avalanche", "lightning",
            "golden knights", "oilers", "flames", "mcdavid", "crosby", "ovechkin",
        ],
    ),
    (
        "soccer",
        &[
            "soccer", "premier league", "la liga", "mls", "manchester united", "liverpool",
            "chelsea", "arsenal", "manchester city", "barcelona", "real madrid", "inter miami",
            "messi", "ronaldo", "haaland", "mbappe",
        ],
    ),
];

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

enum Mode {
    /// Feed name -> XML body; used by tests and offline runs.
    Fixture(HashMap<String, String>),
    Http {
        client: reqwest::Client,
        timeout: Duration,
    },
}

pub struct EspnRssProvider {
    mode: Mode,
    feeds: BTreeMap<String, String>,
    max_entries_per_feed: usize,
}

impl EspnRssProvider {
    pub fn from_settings(settings: FeedSettings, http_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("sports-digest-curator/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(http_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            mode: Mode::Http {
                client,
                timeout: http_timeout,
            },
            feeds: settings.urls,
            max_entries_per_feed: settings.max_entries_per_feed,
        }
    }

    /// Serve feeds from in-memory XML keyed by feed name ("general", "nba", ...).
    /// Feeds without a fixture fail like an unreachable upstream.
    pub fn from_fixtures<K, V>(fixtures: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mode: Mode::Fixture(
                fixtures
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            feeds: default_feed_urls(),
            max_entries_per_feed: FeedSettings::default().max_entries_per_feed,
        }
    }

    /// Feed names to pull for these interests, `general` first, then in table order.
    pub fn select_feeds(&self, interests: &[&Interest]) -> Vec<String> {
        let mut wanted: HashSet<&str> = HashSet::new();

        for it in interests {
            let hinted: Vec<String> = [it.metadata.sport.as_deref(), it.metadata.league.as_deref()]
                .into_iter()
                .flatten()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();

            if !hinted.is_empty() {
                for h in &hinted {
                    for (sport, keywords) in SPORT_KEYWORDS {
                        if h == *sport || keywords.iter().any(|kw| h.contains(kw)) {
                            wanted.insert(*sport);
                        }
                    }
                }
                continue;
            }

            let name = it.name.to_lowercase();
            for (sport, keywords) in SPORT_KEYWORDS {
                if keywords.iter().any(|kw| name.contains(kw)) {
                    wanted.insert(*sport);
                }
            }
        }

        let mut out = Vec::new();
        if self.feeds.contains_key(GENERAL_FEED) {
            out.push(GENERAL_FEED.to_string());
        }
        for (sport, _) in SPORT_KEYWORDS {
            if wanted.contains(sport) && self.feeds.contains_key(*sport) {
                out.push(sport.to_string());
            }
        }
        out
    }

    async fn load_feed(&self, name: &str, budget: Duration) -> Result<String, ProviderError> {
        match &self.mode {
            Mode::Fixture(map) => map
                .get(name)
                .cloned()
                .ok_or_else(|| ProviderError::Upstream(format!("no fixture for feed {name}"))),
            Mode::Http { client, timeout } => {
                let url = self
                    .feeds
                    .get(name)
                    .ok_or_else(|| ProviderError::Unavailable(format!("feed {name} not configured")))?;
                let budget = budget.min(*timeout);
                let resp = client
                    .get(url)
                    .timeout(budget)
                    .send()
                    .await
                    .map_err(|e| ProviderError::from_reqwest(e, budget))?;
                if !resp.status().is_success() {
                    return Err(ProviderError::Upstream(format!(
                        "feed {name} returned {}",
                        resp.status()
                    )));
                }
                resp.text()
                    .await
                    .map_err(|e| ProviderError::from_reqwest(e, budget))
            }
        }
    }

    fn parse_feed(xml: &str) -> Result<Vec<Item>, ProviderError> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(&scrub_html_entities_for_xml(xml))
            .map_err(|e| ProviderError::Upstream(format!("parsing rss xml: {e}")))?;
        histogram!("curator_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(rss.channel.item)
    }

    /// Keep entries mentioning at least one interest; returns (item, matched count).
    fn match_entries(&self, entries: Vec<Item>, interests: &[&Interest]) -> Vec<(ContentItem, usize)> {
        let mut out = Vec::new();
        for entry in entries.into_iter().take(self.max_entries_per_feed) {
            let title = normalize_text(entry.title.as_deref().unwrap_or_default());
            let summary = normalize_text(entry.description.as_deref().unwrap_or_default());
            let haystack = format!("{title} {summary}").to_lowercase();

            let matched: Vec<&Interest> = interests
                .iter()
                .copied()
                .filter(|i| haystack.contains(&i.name.to_lowercase()))
                .collect();
            let Some(first) = matched.first() else {
                continue;
            };

            let names = matched.iter().map(|i| i.name.as_str()).collect::<Vec<_>>().join(", ");
            let mut item = ContentItem::new(
                title,
                entry.link.unwrap_or_default().trim(),
                SourceType::Article,
                ProviderKind::Tertiary,
            );
            item.summary = Some(truncate_chars(&summary, SUMMARY_MAX_CHARS)).filter(|s| !s.is_empty());
            item.related_interest = Some(first.name.clone());
            item.published_at = entry.pub_date.as_deref().and_then(parse_rfc2822);
            item.source_name = Some("ESPN".to_string());
            item.relevance_note = Some(format!("Matches your interest in {names}"));
            out.push((item, matched.len()));
        }
        out
    }
}

#[async_trait]
impl ContentProvider for EspnRssProvider {
    async fn fetch(
        &self,
        interests: &[Interest],
        opts: &FetchOptions,
    ) -> Result<Vec<ContentItem>, ProviderError> {
        // Free-text topics don't keyword-match reliably against fixed feeds.
        let supported: Vec<&Interest> = interests
            .iter()
            .filter(|i| i.kind != InterestKind::Custom)
            .collect();
        if supported.is_empty() {
            return Ok(Vec::new());
        }

        let feeds = self.select_feeds(&supported);
        let mut scored: Vec<(ContentItem, usize)> = Vec::new();
        let mut first_err: Option<ProviderError> = None;
        let mut ok_feeds = 0usize;

        for name in &feeds {
            let parsed = match self.load_feed(name, opts.timeout).await {
                Ok(xml) => Self::parse_feed(&xml),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(entries) => {
                    ok_feeds += 1;
                    scored.extend(self.match_entries(entries, &supported));
                }
                Err(e) => {
                    tracing::warn!(provider = "espn_rss", feed = %name, error = %e, "feed failed; skipping");
                    first_err.get_or_insert(e);
                }
            }
        }

        if ok_feeds == 0 {
            return Err(first_err.unwrap_or_else(|| ProviderError::Unavailable("no feeds configured".into())));
        }

        // The general feed repeats stories from sport feeds.
        let mut seen = HashSet::new();
        scored.retain(|(it, _)| match normalize_url(&it.url) {
            Some(k) => seen.insert(k),
            None => true,
        });

        // Stable: feed order breaks ties.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(scored
            .into_iter()
            .take(opts.target_items)
            .map(|(it, _)| it)
            .collect())
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Tertiary
    }

    fn name(&self) -> &'static str {
        "espn_rss"
    }
}

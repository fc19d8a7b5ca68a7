// src/curator/providers/claude.rs
//! Primary adapter: Anthropic Messages API with the server-side web search tool.
//!
//! Two stages, one request each:
//! 1. search: one prompt for the whole interest batch, expects a JSON array;
//! 2. verify (optional): a second model pass keeps only items scored 7+.
//!    A failed verification falls back to the unverified list.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnthropicSettings;
use crate::curator::error::ProviderError;
use crate::curator::providers::parsing::{
    ai_items_to_content, describe_interests, extract_json_from_text, parse_ai_items, RawAiItem,
};
use crate::curator::types::{ContentItem, ContentProvider, FetchOptions, Interest, ProviderKind};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const WEB_SEARCH_MAX_USES: u32 = 10;
const MIN_VERIFIED_SCORE: f64 = 7.0;

const SEARCH_PROMPT: &str = r#"You are a sports news curator. Find {count} recent news items for someone who follows:
{interests}

Today is {date}. Only include content from the PAST {days} DAYS.

Each item MUST be DIRECTLY about one of the listed interests. Skip items where the
interest is only briefly mentioned and general league news that does not feature it.

Look for articles, social media posts from players, teams or reporters, video
highlights, interviews and team or player subreddit discussions.

For each item provide: headline, summary (2-3 sentences), source_type
("article" | "tweet" | "video" | "reddit" | "highlight"), source_name, url (direct link),
relevance (which interest it relates to and why it matters), published_at (ISO datetime),
thumbnail_url (if available), author_handle (@username for social posts).

Return ONLY a valid JSON array. No markdown, no explanation."#;

const VERIFY_PROMPT: &str = r#"You are a relevance verification agent. Review these news items for a user who follows:
{interests}

Score each item 1-10: 10 = entirely about one of the interests, 7-9 = interest is a
primary subject, 4-6 = mentioned but not the focus, 1-3 = barely mentioned.

Items:
{items_json}

Return ONLY valid JSON of the form:
{"verified_items": [...items scoring 7 or more, each with an added "relevance_score"...], "rejected_count": N}"#;

pub struct ClaudeProvider {
    http: reqwest::Client,
    settings: AnthropicSettings,
    max_age_days: i64,
    http_timeout: Duration,
}

impl ClaudeProvider {
    pub fn new(settings: AnthropicSettings, max_age_days: i64, http_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("sports-digest-curator/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(http_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            settings,
            max_age_days,
            http_timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'))
    }

    /// Caller budget wins over the client default when it is tighter.
    fn request_budget(&self, opts: &FetchOptions) -> Duration {
        opts.timeout.min(self.http_timeout)
    }

    async fn call(&self, req: &MessagesReq<'_>, budget: Duration) -> Result<String, ProviderError> {
        let resp = self
            .http
            .post(self.endpoint())
            .timeout(budget)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(req)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, budget))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream(format!(
                "anthropic returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: MessagesResp = resp
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("anthropic body: {e}")))?;
        Ok(body.joined_text())
    }

    async fn search(
        &self,
        interests: &[Interest],
        target: usize,
        now: DateTime<Utc>,
        budget: Duration,
    ) -> Result<Vec<RawAiItem>, ProviderError> {
        let prompt = SEARCH_PROMPT
            .replace("{count}", &format!("{}-{}", target, target.saturating_add(3)))
            .replace("{interests}", &describe_interests(interests))
            .replace("{date}", &now.format("%Y-%m-%d").to_string())
            .replace("{days}", &self.max_age_days.to_string());

        let req = MessagesReq {
            model: &self.settings.search_model,
            max_tokens: self.settings.max_tokens,
            tools: vec![Tool {
                kind: "web_search_20250305",
                name: "web_search",
                max_uses: WEB_SEARCH_MAX_USES,
            }],
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
        };

        tracing::debug!(provider = "claude", model = %self.settings.search_model, "search request");
        let text = self.call(&req, budget).await?;
        parse_ai_items(&text)
    }

    /// Verification is best effort: any failure keeps the unverified items.
    async fn verify(
        &self,
        interests: &[Interest],
        items: Vec<RawAiItem>,
        budget: Duration,
    ) -> Vec<RawAiItem> {
        let items_json = serde_json::to_string_pretty(&items.iter().map(VerifyItem::from).collect::<Vec<_>>())
            .unwrap_or_else(|_| "[]".to_string());
        let prompt = VERIFY_PROMPT
            .replace("{interests}", &describe_interests(interests))
            .replace("{items_json}", &items_json);

        let req = MessagesReq {
            model: &self.settings.verify_model,
            max_tokens: self.settings.max_tokens,
            tools: Vec::new(),
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
        };

        let text = match self.call(&req, budget).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(provider = "claude", error = %e, "verification failed; keeping unverified items");
                return items;
            }
        };

        match parse_verification(&text) {
            Some(v) => {
                if v.rejected_count > 0 {
                    tracing::info!(provider = "claude", rejected = v.rejected_count, "verification rejected items");
                }
                v.verified_items
                    .into_iter()
                    .filter(|it| it.relevance_score.map_or(true, |s| s >= MIN_VERIFIED_SCORE))
                    .collect()
            }
            None => {
                tracing::warn!(provider = "claude", "unparseable verification answer; keeping unverified items");
                items
            }
        }
    }
}

#[async_trait]
impl ContentProvider for ClaudeProvider {
    async fn fetch(
        &self,
        interests: &[Interest],
        opts: &FetchOptions,
    ) -> Result<Vec<ContentItem>, ProviderError> {
        if self.settings.api_key.is_empty() {
            return Err(ProviderError::Unavailable("anthropic api key not configured".into()));
        }
        if interests.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let budget = self.request_budget(opts);
        let raw = self.search(interests, opts.target_items, now, budget).await?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        let found = raw.len();

        let raw = if self.settings.verify {
            self.verify(interests, raw, budget).await
        } else {
            raw
        };
        if raw.len() < 3 && found >= 3 {
            tracing::warn!(provider = "claude", found, kept = raw.len(), "verification filtered aggressively");
        }

        Ok(ai_items_to_content(raw, ProviderKind::Primary, interests, self.max_age_days, now))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Tool {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
    max_uses: u32,
}

#[derive(Serialize)]
struct MessagesReq<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct MessagesResp {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResp {
    /// Web search answers interleave tool blocks with several text blocks.
    fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Serialize)]
struct VerifyItem<'a> {
    headline: Option<&'a str>,
    summary: Option<&'a str>,
    source_type: Option<&'a str>,
    source_name: Option<&'a str>,
    url: Option<&'a str>,
    relevance: Option<&'a str>,
    published_at: Option<&'a str>,
    thumbnail_url: Option<&'a str>,
    author_handle: Option<&'a str>,
}

impl<'a> From<&'a RawAiItem> for VerifyItem<'a> {
    fn from(it: &'a RawAiItem) -> Self {
        Self {
            headline: it.headline.as_deref(),
            summary: it.summary.as_deref(),
            source_type: it.source_type.as_deref(),
            source_name: it.source_name.as_deref(),
            url: it.url.as_deref(),
            relevance: it.relevance.as_deref(),
            published_at: it.published_at.as_deref(),
            thumbnail_url: it.thumbnail_url.as_deref(),
            author_handle: it.author_handle.as_deref(),
        }
    }
}

#[derive(Deserialize)]
struct Verification {
    #[serde(default)]
    verified_items: Vec<RawAiItem>,
    #[serde(default)]
    rejected_count: u32,
}

fn parse_verification(text: &str) -> Option<Verification> {
    let json = extract_json_from_text(text, false);
    serde_json::from_str(&json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks_and_skips_tool_blocks() {
        let resp: MessagesResp = serde_json::from_str(
            r#"{"content":[
                {"type":"text","text":"Searching... "},
                {"type":"server_tool_use","id":"x","name":"web_search"},
                {"type":"web_search_tool_result","content":[]},
                {"type":"text","text":"[{\"headline\":\"a\"}]"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.joined_text(), r#"Searching... [{"headline":"a"}]"#);
        let items = parse_ai_items(&resp.joined_text()).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn verification_answer_parses_and_filters_by_score() {
        let v = parse_verification(
            r#"```json
            {"verified_items":[{"headline":"a","relevance_score":9},{"headline":"b","relevance_score":5}],
             "rejected_count":2}
            ```"#,
        )
        .unwrap();
        assert_eq!(v.rejected_count, 2);
        let kept: Vec<_> = v
            .verified_items
            .into_iter()
            .filter(|it| it.relevance_score.map_or(true, |s| s >= MIN_VERIFIED_SCORE))
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(parse_verification("nope").is_none());
    }

    #[test]
    fn search_request_serializes_web_search_tool() {
        let req = MessagesReq {
            model: "m",
            max_tokens: 10,
            tools: vec![Tool {
                kind: "web_search_20250305",
                name: "web_search",
                max_uses: WEB_SEARCH_MAX_USES,
            }],
            messages: vec![Msg { role: "user", content: "hi" }],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["tools"][0]["type"], "web_search_20250305");
        assert_eq!(v["tools"][0]["max_uses"], 10);

        let no_tools = MessagesReq { tools: Vec::new(), ..req };
        let v = serde_json::to_value(&no_tools).unwrap();
        assert!(v.get("tools").is_none());
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let p = ClaudeProvider::new(AnthropicSettings::default(), 10, Duration::from_secs(1));
        let err = p
            .fetch(&[Interest::team("Warriors")], &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}

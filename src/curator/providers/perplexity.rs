// src/curator/providers/perplexity.rs
//! Secondary adapter: Perplexity chat completions (OpenAI-compatible API).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::PerplexitySettings;
use crate::curator::error::ProviderError;
use crate::curator::providers::parsing::{ai_items_to_content, describe_interests, parse_ai_items};
use crate::curator::types::{ContentItem, ContentProvider, FetchOptions, Interest, ProviderKind};

const SYSTEM_PROMPT: &str = "You are a sports news curator. Return only valid JSON.";

const CURATOR_PROMPT: &str = r#"The user follows these teams/players/topics:
{interests}

Find the most important and interesting sports news from the past {days} days related to
these interests, from news articles, social media, YouTube and Reddit.

Select the TOP {count} stories and return them as a JSON array. Each item should have:
headline, summary (2-3 sentences), source_type ("article" | "tweet" | "video" | "reddit" |
"highlight"), source_name, url (direct link), relevance (one sentence on why this matters
to this fan), published_at (ISO datetime or null), thumbnail_url (or null).

Return ONLY valid JSON as an array. No other text or explanation."#;

pub struct PerplexityProvider {
    http: reqwest::Client,
    settings: PerplexitySettings,
    max_age_days: i64,
    http_timeout: Duration,
}

impl PerplexityProvider {
    pub fn new(settings: PerplexitySettings, max_age_days: i64, http_timeout: Duration) -> Self {
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

    fn build_prompt(&self, interests: &[Interest], target: usize) -> String {
        CURATOR_PROMPT
            .replace("{interests}", &describe_interests(interests))
            .replace("{days}", &self.max_age_days.to_string())
            .replace("{count}", &target.to_string())
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[async_trait]
impl ContentProvider for PerplexityProvider {
    async fn fetch(
        &self,
        interests: &[Interest],
        opts: &FetchOptions,
    ) -> Result<Vec<ContentItem>, ProviderError> {
        if self.settings.api_key.is_empty() {
            return Err(ProviderError::Unavailable("perplexity api key not configured".into()));
        }
        if interests.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = self.build_prompt(interests, opts.target_items);
        let req = Req {
            model: &self.settings.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let budget = opts.timeout.min(self.http_timeout);
        let resp = self
            .http
            .post(url)
            .timeout(budget)
            .bearer_auth(&self.settings.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, budget))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Upstream(format!("perplexity returned {status}")));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("perplexity body: {e}")))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ProviderError::Upstream("perplexity returned no choices".into()))?;

        let raw = parse_ai_items(content)?;
        Ok(ai_items_to_content(
            raw,
            ProviderKind::Secondary,
            interests,
            self.max_age_days,
            Utc::now(),
        ))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Secondary
    }

    fn name(&self) -> &'static str {
        "perplexity"
    }
}

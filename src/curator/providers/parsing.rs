// src/curator/providers/parsing.rs
//! Shared helpers for turning loosely structured backend output into `ContentItem`s.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::curator::error::ProviderError;
use crate::curator::types::{ContentItem, Interest, InterestKind, ProviderKind, SourceType};

/// Normalize feed/AI text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Cap to `max_chars` characters, ending with "..." when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Remove `<cite ...>` wrappers left by web-search answers, keeping the inner text.
pub fn strip_citations(text: &str) -> String {
    static RE_CITE: OnceCell<Regex> = OnceCell::new();
    let re = RE_CITE.get_or_init(|| Regex::new(r"(?is)</?cite[^>]*>").expect("static regex"));
    re.replace_all(text, "").trim().to_string()
}

/// Pull the JSON payload out of a model answer that may wrap it in markdown
/// fences or surrounding prose.
pub fn extract_json_from_text(text: &str, expect_array: bool) -> String {
    let text = text.trim();

    if let Some(rest) = text.split_once("```json").map(|(_, r)| r) {
        return rest.split("```").next().unwrap_or(rest).trim().to_string();
    }
    let mut fenced = text.split("```");
    if let (Some(_), Some(inner)) = (fenced.next(), fenced.next()) {
        return inner.trim().to_string();
    }

    let (open, close) = if expect_array { ('[', ']') } else { ('{', '}') };
    match (text.find(open), text.rfind(close)) {
        (Some(start), Some(end)) if end > start => text[start..=end].trim().to_string(),
        _ => text.to_string(),
    }
}

/// RFC 3339 first ("Z" or offset), then naive ISO-8601 interpreted as UTC.
pub fn parse_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Item shape both AI backends are prompted to return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAiItem {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub relevance: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub author_handle: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

/// Parse a JSON array of items out of a model answer. Malformed output is an upstream error.
pub fn parse_ai_items(text: &str) -> Result<Vec<RawAiItem>, ProviderError> {
    let json = extract_json_from_text(text, true);
    serde_json::from_str::<Vec<RawAiItem>>(&json)
        .map_err(|e| ProviderError::Upstream(format!("malformed item list: {e}")))
}

/// First interest whose name occurs (case-insensitive) in any of `haystacks`.
pub fn match_interest<'a>(interests: &'a [Interest], haystacks: &[&str]) -> Option<&'a Interest> {
    let text = haystacks.join(" ").to_lowercase();
    interests
        .iter()
        .find(|i| !i.name.is_empty() && text.contains(&i.name.to_lowercase()))
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Map AI items into content items, dropping anything older than `max_age_days`.
/// Undated items are kept.
pub fn ai_items_to_content(
    raw: Vec<RawAiItem>,
    provider: ProviderKind,
    interests: &[Interest],
    max_age_days: i64,
    now: DateTime<Utc>,
) -> Vec<ContentItem> {
    let cutoff = now - ChronoDuration::days(max_age_days);
    let mut out = Vec::with_capacity(raw.len());

    for it in raw {
        let published_at = parse_datetime(it.published_at.as_deref());
        if matches!(published_at, Some(ts) if ts < cutoff) {
            tracing::debug!(provider = provider.as_str(), url = ?it.url, "skipping item older than cutoff");
            continue;
        }

        let title = strip_citations(it.headline.as_deref().unwrap_or_default());
        let summary = non_empty(it.summary.as_deref().map(strip_citations));
        let relevance_note = non_empty(it.relevance.as_deref().map(strip_citations));
        let related_interest = match_interest(
            interests,
            &[
                relevance_note.as_deref().unwrap_or_default(),
                title.as_str(),
                summary.as_deref().unwrap_or_default(),
            ],
        )
        .map(|i| i.name.clone());

        out.push(ContentItem {
            title,
            url: it.url.unwrap_or_default().trim().to_string(),
            summary,
            source_type: SourceType::from_label(it.source_type.as_deref().unwrap_or("article")),
            related_interest,
            provider,
            published_at,
            source_name: non_empty(it.source_name),
            thumbnail_url: non_empty(it.thumbnail_url),
            author_handle: non_empty(it.author_handle),
            relevance_note,
        });
    }
    out
}

/// "Dallas Cowboys (team), Patrick Mahomes (athlete)" style list for prompts.
pub fn describe_interests(interests: &[Interest]) -> String {
    interests
        .iter()
        .map(|i| {
            let kind = match i.kind {
                InterestKind::Team => "team",
                InterestKind::Athlete => "athlete",
                InterestKind::Custom => "topic",
            };
            match i.metadata.league.as_deref().or(i.metadata.sport.as_deref()) {
                Some(league) => format!("{} ({kind}, {league})", i.name),
                None => format!("{} ({kind})", i.name),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn extracts_json_from_fences_and_prose() {
        let fenced = "Here you go:\n```json\n[{\"url\":\"https://a.com\"}]\n```\nEnjoy";
        assert_eq!(extract_json_from_text(fenced, true), r#"[{"url":"https://a.com"}]"#);

        let bare_fence = "```\n{\"a\":1}\n```";
        assert_eq!(extract_json_from_text(bare_fence, false), r#"{"a":1}"#);

        let prose = "Sure! [1, 2, 3] hope that helps";
        assert_eq!(extract_json_from_text(prose, true), "[1, 2, 3]");

        let obj = "result: {\"verified_items\": []} done";
        assert_eq!(extract_json_from_text(obj, false), r#"{"verified_items": []}"#);
    }

    #[test]
    fn strips_closed_and_unclosed_citations() {
        let s = r#"<cite index="23-3,23-4">Curry scores 50</cite> in win"#;
        assert_eq!(strip_citations(s), "Curry scores 50 in win");
        let unclosed = r#"<cite index="1-2">Warriors trade"#;
        assert_eq!(strip_citations(unclosed), "Warriors trade");
    }

    #[test]
    fn parses_iso_variants() {
        let z = parse_datetime(Some("2025-01-05T10:00:00Z")).unwrap();
        assert_eq!(z, Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap());
        let naive = parse_datetime(Some("2025-01-05T10:00:00")).unwrap();
        assert_eq!(naive, z);
        assert!(parse_datetime(Some("2025-01-05")).is_some());
        assert!(parse_datetime(Some("last tuesday")).is_none());
        assert!(parse_datetime(None).is_none());
    }

    #[test]
    fn maps_ai_items_with_age_cutoff_and_interest_backref() {
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap();
        let raw = parse_ai_items(
            r#"```json
            [
              {"headline":"Warriors win","url":"https://espn.com/1","source_type":"video",
               "relevance":"Big night for the Warriors","published_at":"2025-01-19T00:00:00Z"},
              {"headline":"Old news","url":"https://espn.com/2","published_at":"2024-12-01T00:00:00Z"},
              {"headline":"Undated","url":"https://espn.com/3","summary":""}
            ]
            ```"#,
        )
        .unwrap();
        let interests = vec![Interest::team("Warriors")];
        let items = ai_items_to_content(raw, ProviderKind::Primary, &interests, 10, now);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_type, SourceType::Video);
        assert_eq!(items[0].related_interest.as_deref(), Some("Warriors"));
        assert_eq!(items[1].title, "Undated");
        assert!(items[1].summary.is_none());
        assert!(items.iter().all(|i| i.provider == ProviderKind::Primary));
    }

    #[test]
    fn malformed_ai_output_is_upstream_error() {
        let err = parse_ai_items("I could not find anything, sorry.").unwrap_err();
        assert!(matches!(err, ProviderError::Upstream(_)));
    }

    #[test]
    fn normalize_and_truncate() {
        assert_eq!(normalize_text("  <p>Curry&nbsp;&amp; Co</p>\n\n wins "), "Curry & Co wins");
        assert_eq!(truncate_chars("abcdef", 5), "ab...");
        assert_eq!(truncate_chars("abc", 5), "abc");
    }
}

// src/curator/dedup.rs
//! Cross-provider deduplication and final ordering.
//!
//! - Duplicate key: normalized URL (scheme + host + path; query, fragment and
//!   trailing slash dropped; lowercased).
//! - Winner per key: higher-priority provider, then earliest `published_at`
//!   (dated beats undated), then first seen.
//! - Output: winners grouped by provider priority, each provider keeping its
//!   own relative order, truncated to `max_items`. Never padded.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::curator::types::ContentItem;

/// Identity key used to detect the same story across providers.
/// Returns `None` for strings that are not absolute URLs.
pub fn normalize_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?;

    let mut key = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        key.push_str(&format!(":{port}"));
    }
    let path = parsed.path().trim_end_matches('/');
    key.push_str(path);

    Some(key.to_lowercase())
}

/// True if `a` should replace `b` as the representative of a duplicate group.
/// First-seen order is the caller's tiebreak, so equal candidates return false.
fn beats(a: &ContentItem, b: &ContentItem) -> bool {
    match a.provider.cmp(&b.provider) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => x < y,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Collapse duplicates and impose the final order. Idempotent.
pub fn dedup_and_rank(items: Vec<ContentItem>, max_items: usize) -> Vec<ContentItem> {
    // key -> (first-seen index of the current winner)
    let mut winners: HashMap<String, usize> = HashMap::new();
    let mut keys: Vec<Option<String>> = Vec::with_capacity(items.len());

    for (idx, it) in items.iter().enumerate() {
        let key = normalize_url(&it.url);
        if let Some(k) = &key {
            match winners.get(k) {
                Some(&cur) if !beats(it, &items[cur]) => {}
                _ => {
                    winners.insert(k.clone(), idx);
                }
            }
        }
        keys.push(key);
    }

    let mut kept: Vec<(usize, ContentItem)> = items
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| match &keys[*idx] {
            Some(k) => winners.get(k) == Some(idx),
            // Unparseable URLs are filtered upstream; drop them here too.
            None => false,
        })
        .collect();

    // Stable: provider priority first, then original position.
    kept.sort_by(|(ia, a), (ib, b)| a.provider.cmp(&b.provider).then(ia.cmp(ib)));
    kept.truncate(max_items);
    kept.into_iter().map(|(_, it)| it).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curator::types::{ProviderKind, SourceType};
    use chrono::{TimeZone, Utc};

    fn item(url: &str, provider: ProviderKind) -> ContentItem {
        ContentItem::new(format!("t {url}"), url, SourceType::Article, provider)
    }

    #[test]
    fn normalize_url_strips_query_fragment_slash_and_case() {
        let a = normalize_url("HTTPS://ESPN.com/NBA/Story/123/?utm_source=x#top").unwrap();
        let b = normalize_url("https://espn.com/nba/story/123").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "https://espn.com/nba/story/123");
    }

    #[test]
    fn normalize_url_keeps_non_default_port_and_rejects_relative() {
        assert_eq!(
            normalize_url("http://localhost:8080/a/").as_deref(),
            Some("http://localhost:8080/a")
        );
        assert_eq!(normalize_url("https://example.com:443/a").as_deref(), Some("https://example.com/a"));
        assert!(normalize_url("/relative/path").is_none());
    }

    #[test]
    fn same_provider_tie_prefers_earliest_then_first_seen() {
        let mut late = item("https://x.com/a", ProviderKind::Secondary);
        late.published_at = Some(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());
        let mut early = item("https://x.com/a?ref=feed", ProviderKind::Secondary);
        early.published_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let undated = item("https://x.com/a/", ProviderKind::Secondary);

        let out = dedup_and_rank(vec![undated.clone(), late, early.clone()], 7);
        assert_eq!(out, vec![early]);

        let first = item("https://x.com/b", ProviderKind::Tertiary);
        let mut second = item("https://x.com/b", ProviderKind::Tertiary);
        second.title = "second".into();
        let out = dedup_and_rank(vec![first.clone(), second], 7);
        assert_eq!(out, vec![first]);
    }

    #[test]
    fn truncates_to_max_without_padding() {
        let items: Vec<_> = (0..10)
            .map(|i| item(&format!("https://x.com/{i}"), ProviderKind::Primary))
            .collect();
        assert_eq!(dedup_and_rank(items.clone(), 7).len(), 7);
        assert_eq!(dedup_and_rank(items[..2].to_vec(), 7).len(), 2);
    }
}

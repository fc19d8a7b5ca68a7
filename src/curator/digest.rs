// src/curator/digest.rs
//! Digest assembly. Pure: no I/O, the timestamp is passed in.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::curator::error::ProviderErrorKind;
use crate::curator::types::{ContentItem, ProviderKind};

/// Outcome of one adapter attempt within a generation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Items { count: usize },
    Failed { kind: ProviderErrorKind, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: ProviderKind,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Final product of one `generate` call. The curator keeps no reference to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Digest {
    pub items: Vec<ContentItem>,
    pub generated_at: DateTime<Utc>,
    pub providers_used: BTreeSet<ProviderKind>,
    pub degraded: bool,
    #[serde(default)]
    pub interests_used: Vec<String>,
    #[serde(default)]
    pub attempts: Vec<ProviderAttempt>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn assemble(
    items: Vec<ContentItem>,
    interests_used: Vec<String>,
    attempts: Vec<ProviderAttempt>,
    min_items: usize,
    generated_at: DateTime<Utc>,
) -> Digest {
    let providers_used = items.iter().map(|it| it.provider).collect();
    let degraded = items.len() < min_items;
    Digest {
        items,
        generated_at,
        providers_used,
        degraded,
        interests_used,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curator::types::SourceType;
    use chrono::TimeZone;

    #[test]
    fn providers_used_counts_only_surviving_items() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let items = vec![
            ContentItem::new("a", "https://a.com/1", SourceType::Article, ProviderKind::Secondary),
            ContentItem::new("b", "https://a.com/2", SourceType::Video, ProviderKind::Tertiary),
        ];
        let attempts = vec![ProviderAttempt {
            provider: ProviderKind::Primary,
            outcome: AttemptOutcome::Failed {
                kind: ProviderErrorKind::Timeout,
                message: "slow".into(),
            },
        }];
        let d = assemble(items, vec!["Warriors".into()], attempts, 3, ts);
        assert_eq!(
            d.providers_used.into_iter().collect::<Vec<_>>(),
            vec![ProviderKind::Secondary, ProviderKind::Tertiary]
        );
        assert!(d.degraded);
        assert_eq!(d.generated_at, ts);
    }

    #[test]
    fn assembly_is_deterministic() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let items: Vec<_> = (0..3)
            .map(|i| ContentItem::new("t", format!("https://a.com/{i}"), SourceType::Article, ProviderKind::Primary))
            .collect();
        let a = assemble(items.clone(), vec![], vec![], 3, ts);
        let b = assemble(items, vec![], vec![], 3, ts);
        assert_eq!(a, b);
        assert!(!a.degraded);
    }

    #[test]
    fn attempt_serializes_flat() {
        let a = ProviderAttempt {
            provider: ProviderKind::Primary,
            outcome: AttemptOutcome::Items { count: 4 },
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["provider"], "primary");
        assert_eq!(v["status"], "items");
        assert_eq!(v["count"], 4);
    }
}

// src/curator/error.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single adapter attempt. Every adapter maps its failures onto these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider exceeded its time budget of {0:?}")]
    Timeout(Duration),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Timeout,
    Upstream,
    Unavailable,
}

impl ProviderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Upstream => "upstream",
            ProviderErrorKind::Unavailable => "unavailable",
        }
    }
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::Timeout(_) => ProviderErrorKind::Timeout,
            ProviderError::Upstream(_) => ProviderErrorKind::Upstream,
            ProviderError::Unavailable(_) => ProviderErrorKind::Unavailable,
        }
    }

    /// Classify a reqwest failure. Client-side timeouts keep their own kind,
    /// everything else (connect, body, decode) counts as upstream.
    pub fn from_reqwest(err: reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(budget)
        } else {
            ProviderError::Upstream(err.to_string())
        }
    }
}

/// Errors surfaced by the curator to its callers.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The caller withdrew the request; no digest is produced.
    #[error("digest generation cancelled")]
    Cancelled,
    /// Only returned by single-provider runs; the cascade absorbs provider errors.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

// src/lib.rs
// Public library surface for the service binary, the demo CLI and integration tests.

pub mod api;
pub mod config;
pub mod curator;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::{CuratorConfig, GenerationConfig};
pub use crate::curator::digest::Digest;
pub use crate::curator::error::{GenerateError, ProviderError};
pub use crate::curator::types::{
    ContentItem, ContentProvider, FetchOptions, Interest, InterestKind, ProviderKind, SourceType,
};
pub use crate::curator::Curator;

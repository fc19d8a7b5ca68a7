// src/config/mod.rs
pub mod curator;

pub use curator::{
    AnthropicSettings, CuratorConfig, FeedSettings, GenerationConfig, GenerationDefaults,
    PerplexitySettings, MAX_ITEMS_LIMIT,
};

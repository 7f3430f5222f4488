//! Shared types, error model, and configuration for ChannelScope.
//!
//! This crate is the foundation depended on by all other ChannelScope crates.
//! It provides:
//! - [`ChannelScopeError`], the unified error type
//! - Domain records ([`ItemRecord`], [`ComparisonChannel`], [`ChannelSummary`],
//!   [`Recommendation`], [`Script`])
//! - Configuration ([`AppConfig`], [`PipelineOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OllamaConfig, PipelineOptions, YouTubeConfig, config_dir,
    config_file_path, database_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{ChannelScopeError, Result};
pub use types::{
    ChannelSummary, ComparisonChannel, ItemRecord, Recommendation, Script, ScriptSection,
};

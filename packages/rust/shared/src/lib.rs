//! Shared types, error model, and configuration for Prospector.
//!
//! This crate is the foundation depended on by all other Prospector crates.
//! It provides:
//! - [`ProspectorError`]: the unified error type
//! - Domain types ([`CompanyRecord`], [`PageContent`], [`SearchResult`],
//!   [`RecoveryDecision`], [`CompanyClassification`])
//! - Configuration ([`AppConfig`], config loading, failure policies)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FailurePolicy, FetcherConfig, ModelConfig, PolicyConfig, ProspectingConfig,
    RecoveredPagePolicy, SearchConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_api_key,
};
pub use error::{ProspectorError, Result};
pub use types::{
    CompanyClassification, CompanyRecord, InterestScore, PageContent, ProspectCategory,
    RecoveryDecision, SearchResult,
};

//! Shared types, error model, and configuration for Docweaver.
//!
//! This crate is the foundation depended on by all other Docweaver crates.
//! It provides:
//! - [`DocweaverError`] — the unified error type
//! - Domain types ([`OutlineSection`], [`WebSnippet`], [`ContextBundle`], [`RunContext`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, MediaConfig, StoreConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{DocweaverError, Result};
pub use types::{
    ContextBundle, LocalSnippet, MAX_WEB_SNIPPETS, NO_REFERENCE_MARKER, OutlineSection,
    RunContext, SNIPPET_PREVIEW_CHARS, WebSnippet,
};

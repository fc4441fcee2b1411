//! Shared types, error model, and configuration for issuekb.
//!
//! This crate is the foundation depended on by all other issuekb crates.
//! It provides:
//! - [`IssueKbError`], the unified error type
//! - Domain records ([`Thread`], [`QaPair`], [`Discussion`], [`MaintainerSet`], ...)
//! - [`normalize`], participant and timestamp normalization
//! - Configuration ([`AppConfig`], [`RefineConfig`], config loading)

pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, MaintainersConfig, RefineConfig, RefineSettings, check_api_key,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{IssueKbError, Result};
pub use types::{
    Answer, Candidate, Comment, Discussion, MaintainerSet, QaPair, RefinedQa, Response, Thread,
    ThreadState, Topic,
};

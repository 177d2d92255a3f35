//! Shared types, error model, and configuration for athenai.
//!
//! This crate is the foundation depended on by all other athenai crates.
//! It provides:
//! - [`AthenaiError`]: the unified error type
//! - Domain model records and their validators ([`User`], [`Project`], ...)
//! - Ingestion types ([`RepoRef`], [`ReadmeRecord`], [`SearchMode`], [`RunId`])
//! - Configuration ([`AppConfig`], [`GithubConfig`], config loading)

pub mod config;
pub mod error;
pub mod model;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseSection, GithubConfig, GithubSection, IngestSection, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_token,
};
pub use error::{AthenaiError, Result};
pub use model::{
    ApprovalStatus, Domain, PersonProject, PersonSkill, Project, ProjectDomain,
    ProjectSkillRequirement, ProjectStatus, Skill, User, validate_duration,
};
pub use types::{ReadmeRecord, RepoRef, RunId, SearchMode};

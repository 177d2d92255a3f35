//! Application configuration for athenai.
//!
//! User config lives at `~/.athenai/athenai.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AthenaiError, Result};
use crate::types::SearchMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "athenai.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".athenai";

// ---------------------------------------------------------------------------
// Config structs (matching athenai.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GithubSection,

    /// Ingestion defaults.
    #[serde(default)]
    pub ingest: IngestSection,

    /// Domain model database.
    #[serde(default)]
    pub database: DatabaseSection,
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSection {
    /// REST API root.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name of the env var holding the access token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Results requested per search term.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Maximum concurrent README fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            per_page: default_per_page(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_per_page() -> u32 {
    30
}
fn default_concurrency() -> u32 {
    4
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSection {
    /// Newline-delimited keyword file.
    #[serde(default = "default_keywords_path")]
    pub keywords_path: String,

    /// Concatenated README output.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Search by topic or by description.
    #[serde(default)]
    pub mode: SearchMode,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            keywords_path: default_keywords_path(),
            output_path: default_output_path(),
            mode: SearchMode::default(),
        }
    }
}

fn default_keywords_path() -> String {
    "keywords.txt".into()
}
fn default_output_path() -> String {
    "readmes.txt".into()
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "athenai.db".into()
}

// ---------------------------------------------------------------------------
// GitHub client config (runtime, merged from config + environment)
// ---------------------------------------------------------------------------

/// Runtime GitHub client configuration, built once at process start.
#[derive(Clone)]
pub struct GithubConfig {
    /// REST API root without a trailing slash.
    pub api_base: String,
    /// Access token sent as a bearer credential.
    pub token: String,
    pub timeout_secs: u64,
    pub per_page: u32,
    pub concurrency: u32,
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("per_page", &self.per_page)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl GithubConfig {
    /// Merge the `[github]` section with an already-resolved token.
    pub fn from_section(section: &GithubSection, token: String) -> Self {
        Self {
            api_base: section.api_base.trim_end_matches('/').to_string(),
            token,
            timeout_secs: section.timeout_secs,
            per_page: section.per_page,
            concurrency: section.concurrency.max(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.athenai/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AthenaiError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.athenai/athenai.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AthenaiError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        AthenaiError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AthenaiError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AthenaiError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AthenaiError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the GitHub token from the env var named in the config.
pub fn resolve_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.github.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(AthenaiError::config(format!(
            "GitHub access token not found. Set the {var_name} environment variable.\n\
             Create a token at https://github.com/settings/tokens"
        ))),
    }
}

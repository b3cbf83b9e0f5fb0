//! Application configuration for Docweaver.
//!
//! User config lives at `~/.docweaver/docweaver.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocweaverError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docweaver.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docweaver";

// ---------------------------------------------------------------------------
// Config structs (matching docweaver.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Completion endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Media acquisition settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Local knowledge store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default run output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Default directory of reference files to ingest before a run.
    #[serde(default = "default_files_dir")]
    pub files_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            files_dir: default_files_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_files_dir() -> String {
    "./data".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible chat-completions base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for outline planning and query synthesis.
    #[serde(default = "default_planner_model")]
    pub planner_model: String,

    /// Model used for section prose.
    #[serde(default = "default_writer_model")]
    pub writer_model: String,

    /// Model used for illustration keyword extraction.
    #[serde(default = "default_writer_model")]
    pub visualizer_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            planner_model: default_planner_model(),
            writer_model: default_writer_model(),
            visualizer_model: default_writer_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_planner_model() -> String {
    "deepseek/deepseek-chat".into()
}
fn default_writer_model() -> String {
    "qwen/qwen-2.5-72b-instruct".into()
}

/// `[media]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Per-candidate download timeout in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Minimum accepted image size in KB (filters thumbnails).
    #[serde(default = "default_min_asset_kb")]
    pub min_asset_kb: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: default_download_timeout(),
            min_asset_kb: default_min_asset_kb(),
        }
    }
}

fn default_download_timeout() -> u64 {
    15
}
fn default_min_asset_kb() -> u64 {
    50
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Approximate chunk size in characters for ingestion.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
        }
    }
}

fn default_chunk_chars() -> usize {
    800
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docweaver/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocweaverError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docweaver/docweaver.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| DocweaverError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocweaverError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocweaverError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocweaverError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocweaverError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the completion API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DocweaverError::config(format!(
            "completion API key not found. Set the {var_name} environment variable."
        ))),
    }
}

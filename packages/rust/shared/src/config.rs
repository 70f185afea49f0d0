//! Application configuration for Roadmapper.
//!
//! User config lives at `~/.roadmapper/roadmapper.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadmapError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "roadmapper.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".roadmapper";

// ---------------------------------------------------------------------------
// Config structs (matching roadmapper.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Text-generation service settings.
    #[serde(default)]
    pub cohere: CohereConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Number of topics sent to the generation service per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Minimum top-level topics a sub-roadmap must have to be accepted.
    #[serde(default = "default_min_sub_roadmap_breadth")]
    pub min_sub_roadmap_breadth: usize,

    /// Unit used when `generate` is called without `--unit`.
    #[serde(default = "default_time_unit")]
    pub time_unit: String,

    /// Directory holding the local database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            min_sub_roadmap_breadth: default_min_sub_roadmap_breadth(),
            time_unit: default_time_unit(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_batch_size() -> usize {
    8
}
fn default_min_sub_roadmap_breadth() -> usize {
    2
}
fn default_time_unit() -> String {
    "hours".into()
}
fn default_data_dir() -> String {
    "~/.roadmapper/data".into()
}

/// `[cohere]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Generate endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for roadmap outlines.
    #[serde(default = "default_roadmap_model")]
    pub roadmap_model: String,

    /// Model used for topic descriptions, documents and chat.
    #[serde(default = "default_enrichment_model")]
    pub enrichment_model: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_endpoint(),
            roadmap_model: default_roadmap_model(),
            enrichment_model: default_enrichment_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "COHERE_API_KEY".into()
}
fn default_endpoint() -> String {
    "https://api.cohere.ai/v1/generate".into()
}
fn default_roadmap_model() -> String {
    "command-r-plus".into()
}
fn default_enrichment_model() -> String {
    "command".into()
}
fn default_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    /// Resolve `data_dir`, expanding a leading `~/` to the home directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let raw = &self.defaults.data_dir;
        match raw.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    RoadmapError::config("could not determine home directory")
                })?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(raw)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.roadmapper/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| RoadmapError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.roadmapper/roadmapper.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| RoadmapError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| RoadmapError::config(format!("failed to parse {}: {e}", path.display())))?;

    if config.defaults.batch_size == 0 {
        return Err(RoadmapError::config("defaults.batch_size must be at least 1"));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RoadmapError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RoadmapError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RoadmapError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in `[cohere].api_key_env`.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.cohere.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(RoadmapError::config(format!(
            "text-generation API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}

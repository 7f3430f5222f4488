//! Application configuration for ChannelScope.
//!
//! User config lives at `~/.channelscope/channelscope.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChannelScopeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "channelscope.toml";

/// Default state database file name.
const DATABASE_FILE_NAME: &str = "channelscope.db";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".channelscope";

// ---------------------------------------------------------------------------
// Config structs (matching channelscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// YouTube Data API settings.
    #[serde(default)]
    pub youtube: YouTubeConfig,

    /// Ollama (recommendation oracle) settings.
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Channel analysed when `--channel` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    /// Directory receiving recommendation, script and storyboard artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum number of items fetched for the subject channel.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Maximum number of comparison channels discovered.
    #[serde(default = "default_max_comparison_channels")]
    pub max_comparison_channels: usize,

    /// Items fetched per comparison channel.
    #[serde(default = "default_comparison_items")]
    pub comparison_items: usize,

    /// Length of the top-items and recent-items views.
    #[serde(default = "default_top_items")]
    pub top_items: usize,

    /// Whether a selected recommendation is rendered to a storyboard.
    #[serde(default = "default_true")]
    pub render: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            output_dir: default_output_dir(),
            max_items: default_max_items(),
            max_comparison_channels: default_max_comparison_channels(),
            comparison_items: default_comparison_items(),
            top_items: default_top_items(),
            render: true,
        }
    }
}

fn default_output_dir() -> String {
    "~/channelscope-output".into()
}
fn default_max_items() -> usize {
    50
}
fn default_max_comparison_channels() -> usize {
    5
}
fn default_comparison_items() -> usize {
    20
}
fn default_top_items() -> usize {
    5
}
fn default_true() -> bool {
    true
}

/// `[youtube]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the Data API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_youtube_timeout")]
    pub timeout_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_youtube_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "YOUTUBE_API_KEY".into()
}
fn default_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}
fn default_youtube_timeout() -> u64 {
    30
}

/// `[ollama]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama host; `http://` is assumed when no scheme is given.
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model name passed to `/api/generate`.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Per-request timeout in seconds. Local models can be slow.
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_model(),
            temperature: 0.0,
            timeout_secs: default_ollama_timeout(),
        }
    }
}

fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "gemma3:270m".into()
}
fn default_ollama_timeout() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Pipeline options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Subject channel.
    pub channel_id: String,
    /// Maximum items fetched for the subject channel.
    pub max_items: usize,
    /// Maximum comparison channels.
    pub max_comparison_channels: usize,
    /// Items fetched per comparison channel.
    pub comparison_items: usize,
    /// Length of the top/recent item views cached in the state record.
    pub top_items: usize,
    /// Whether artifact rendering runs after script generation.
    pub render: bool,
    /// Artifact output directory (already tilde-expanded).
    pub output_dir: PathBuf,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            channel_id: config.defaults.channel_id.clone().unwrap_or_default(),
            max_items: config.defaults.max_items,
            max_comparison_channels: config.defaults.max_comparison_channels,
            comparison_items: config.defaults.comparison_items,
            top_items: config.defaults.top_items,
            render: config.defaults.render,
            output_dir: expand_home(&config.defaults.output_dir),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.channelscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChannelScopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.channelscope/channelscope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the path to the state database (`~/.channelscope/channelscope.db`).
pub fn database_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(DATABASE_FILE_NAME))
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
    let content = std::fs::read_to_string(path).map_err(|e| ChannelScopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ChannelScopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChannelScopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ChannelScopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChannelScopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the YouTube API key env var is set and non-empty, returning the key.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.youtube.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ChannelScopeError::config(format!(
            "YouTube API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://console.cloud.google.com/"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("YOUTUBE_API_KEY"));
        assert!(toml_str.contains("gemma3:270m"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
channel_id = "UC_test"
max_items = 10

[ollama]
host = "gpu-box:11434"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.channel_id.as_deref(), Some("UC_test"));
        assert_eq!(config.defaults.max_items, 10);
        assert_eq!(config.defaults.comparison_items, 20);
        assert!(config.defaults.render);
        assert_eq!(config.ollama.host, "gpu-box:11434");
        assert_eq!(config.ollama.model, "gemma3:270m");
        assert_eq!(config.youtube.timeout_secs, 30);
    }

    #[test]
    fn pipeline_options_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.output_dir = "/tmp/channelscope".into();
        let opts = PipelineOptions::from(&app);
        assert_eq!(opts.channel_id, "");
        assert_eq!(opts.max_items, 50);
        assert_eq!(opts.max_comparison_channels, 5);
        assert_eq!(opts.top_items, 5);
        assert_eq!(opts.output_dir, PathBuf::from("/tmp/channelscope"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/out"), PathBuf::from("/var/out"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/out"), home.join("out"));
        }
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.youtube.api_key_env = "CS_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}

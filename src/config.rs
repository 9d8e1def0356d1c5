//! Configuration loading and validation.
//!
//! Configuration comes from `nutriplan.toml` (path overridable via
//! `NUTRIPLAN_CONFIG_PATH`), with credentials layered on top from the
//! environment so API keys never live in the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Oracle backend selection and credentials.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Retry behavior for transient oracle failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Which oracle backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleBackend {
    /// OpenAI-compatible chat completions API.
    Openai,
    /// Local Ollama server.
    Ollama,
}

/// Oracle backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Backend to use.
    #[serde(default = "default_backend")]
    pub backend: OracleBackend,

    /// Model identifier, e.g. "gpt-4o-mini" or "llama3.1".
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL override. Defaults per backend when absent.
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key. Normally injected from `NUTRIPLAN_OPENAI_API_KEY` rather
    /// than written here.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_model(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Retry behavior for transient oracle failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Base delay as a [`Duration`].
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Directory for JSON log files in production mode.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
        }
    }
}

// Default value functions for serde

fn default_backend() -> OracleBackend {
    OracleBackend::Openai
}
fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_logs_dir() -> String {
    "logs".to_owned()
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Load configuration, falling back to defaults when the file is absent.
pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

/// Resolve the config file path: `NUTRIPLAN_CONFIG_PATH` or `./nutriplan.toml`.
pub fn config_path() -> std::path::PathBuf {
    std::env::var("NUTRIPLAN_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("nutriplan.toml"))
}

/// Layer environment overrides on top of a loaded config.
///
/// Takes the variable resolver as a function so tests can inject values
/// without touching the process environment.
pub fn apply_overrides(config: &mut Config, resolve: impl Fn(&str) -> Option<String>) {
    if let Some(key) = resolve("NUTRIPLAN_OPENAI_API_KEY") {
        config.oracle.api_key = Some(key);
    }
    if let Some(model) = resolve("NUTRIPLAN_MODEL") {
        config.oracle.model = model;
    }
    if let Some(url) = resolve("NUTRIPLAN_BASE_URL") {
        config.oracle.base_url = Some(url);
    }
}

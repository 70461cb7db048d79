//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a single TOML file. Resolution order
//! for the file itself:
//! 1. Command-line argument (highest priority)
//! 2. `RISKREG_CONFIG` environment variable
//! 3. `~/.config/riskreg/config.toml` (platform config dir)
//! 4. Compiled defaults (no file)
//!
//! A missing default file is not an error; every section falls back to
//! built-in defaults so a bare checkout can start.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RISKREG_CONFIG";

/// Environment variable overriding the register root folder
pub const ROOT_ENV_VAR: &str = "RISKREG_ROOT";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Folder containing `Risk_Registers/` (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub register: RegisterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Transcript folders to watch, one entry per project
    #[serde(default)]
    pub watchers: Vec<WatcherConfig>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Language model endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// API key (the `ANTHROPIC_API_KEY` environment variable takes priority)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound for a single completion request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Content above this many characters is rejected before calling the model
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

/// Register write behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterConfig {
    /// Serialize reconciler runs per project code inside one process
    #[serde(default = "default_true")]
    pub serialize_writes: bool,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            serialize_writes: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One transcript folder watched for a project
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    pub project: String,
    pub dir: PathBuf,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Wait between detecting a file and reading it
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_content_chars() -> usize {
    400_000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_settle_delay_ms() -> u64 {
    1000
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used
    pub fn validate(&self) -> Result<()> {
        for watcher in &self.watchers {
            if watcher.poll_interval_ms == 0 {
                return Err(Error::Config(format!(
                    "[[watchers]] entry for {} has poll_interval_ms = 0; must be at least 1",
                    watcher.project
                )));
            }
        }
        Ok(())
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("riskreg").join("config.toml"))
}

/// Load configuration following the documented priority order
///
/// An explicitly named file (CLI or environment) must exist. The platform
/// default file is optional; when absent, compiled defaults are used.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        info!("Loading config from {}", path.display());
        return TomlConfig::from_file(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        info!("Loading config from {} ({})", path.display(), CONFIG_ENV_VAR);
        return TomlConfig::from_file(&path);
    }

    // Priority 3: Platform config directory
    if let Some(path) = default_config_path() {
        if path.exists() {
            info!("Loading config from {}", path.display());
            return TomlConfig::from_file(&path);
        }
    }

    // Priority 4: Compiled defaults
    warn!("No config file found, using built-in defaults");
    Ok(TomlConfig::default())
}

/// Resolve the folder that holds `Risk_Registers/`
///
/// Priority: command-line argument, `RISKREG_ROOT`, TOML `root_folder`,
/// then the current directory.
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    PathBuf::from(".")
}

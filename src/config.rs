use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Back-office HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every resource path is joined onto (e.g. `http://localhost:8000/api`)
    pub base_url: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variable holding the bearer token; empty disables auth
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Path prefix of the legacy consultation endpoints
    #[serde(default = "default_consulta_prefix")]
    pub consulta_prefix: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_token_env() -> String {
    "BACKOFFICE_TOKEN".to_string()
}

fn default_consulta_prefix() -> String {
    "soli".to_string()
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
            consulta_prefix: default_consulta_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Items per page on list screens
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Event poll interval for the terminal UI
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
}

fn default_page_size() -> usize {
    4
}

fn default_tick_rate() -> u64 {
    200
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            tick_rate_ms: default_tick_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for logs and other local state
    pub state: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: ".backoffice".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file in TUI mode (false = stderr for debugging)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

impl Config {
    /// Project-local config file, looked up in the working directory
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("backoffice.toml")
    }

    /// User config in ~/.config/backoffice/
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("backoffice").join("config.toml"))
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the client works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with BACKOFFICE_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("BACKOFFICE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config as TOML to the given path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

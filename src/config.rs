use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Platform backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retry attempts for read-only fetches (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Bearer token issued by the authentication service
    #[serde(default)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            token: None,
        }
    }
}

/// Where wizard state and logs are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Prefix for the two wizard keys (`<prefix>.fields`, `<prefix>.step`)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_state_dir() -> String {
    ".feddash/state".to_string()
}

fn default_key_prefix() -> String {
    "training_request".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Catalog cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached catalog response stays fresh (default: 60)
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to a file under the state directory (false = stderr)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    false
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
    /// Path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".feddash/config.toml")
    }

    /// Global config in the platform config dir (`~/.config/feddash/config.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("feddash").join("config.toml"))
    }

    /// Config files that exist, lowest precedence first
    fn file_layers(explicit: Option<&str>) -> Vec<PathBuf> {
        let mut layers: Vec<PathBuf> = [Some(Self::project_config_path()), Self::user_config_path()]
            .into_iter()
            .flatten()
            .filter(|path| path.exists())
            .collect();
        // An explicit path must exist; let the loader report it if not
        layers.extend(explicit.map(PathBuf::from));
        layers
    }

    /// Layer embedded defaults, config files and `FEDDASH__SECTION__KEY`
    /// environment variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults_json = serde_json::to_string(&Config::default())
            .context("Failed to serialize default config")?;

        let builder = Self::file_layers(config_path).into_iter().fold(
            config::Config::builder().add_source(config::File::from_str(
                &defaults_json,
                config::FileFormat::Json,
            )),
            |builder, path| builder.add_source(config::File::from(path)),
        );

        builder
            .add_source(
                config::Environment::with_prefix("FEDDASH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .feddash/config.toml
    pub fn save(&self) -> Result<()> {
        let config_path = Self::project_config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.state_dir)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    /// File backing the wizard's key-value store
    pub fn wizard_store_path(&self) -> PathBuf {
        self.state_path().join("wizard.json")
    }
}

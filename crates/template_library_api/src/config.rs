//! Server configuration
//!
//! Configuration is read from a TOML file whose path comes from `TEMPLATE_LIBRARY_CONFIG`
//! (default `template-library.toml`). Every section has defaults, so a missing default file
//! yields a working development setup. `API_HOST`, `API_PORT` and `RUST_LOG` override the file.
//!
//! Secrets never live in the file. The file names the environment variables that hold them
//! and they are read into [`SecretString`] values on demand.
//!
//! ```toml
//! [server]
//! port = 8080
//!
//! [auth]
//! jwt_secret_env = "TEMPLATE_LIBRARY_JWT_SECRET"
//!
//! [library]
//! admins = ["admin@example.com"]
//! console_base_url = "https://console.example.com"
//!
//! [notifications]
//! policy = "best_effort"
//! webhook_url = "https://hooks.example.com/template-library"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use template_library_core::{NotificationPolicy, RetryPolicy, WorkflowSettings};
use thiserror::Error;

use crate::{server::ApiConfig, DEFAULT_PORT};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "TEMPLATE_LIBRARY_CONFIG";

/// Configuration file used when `TEMPLATE_LIBRARY_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "template-library.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Environment variable '{var}' is not set")]
    MissingSecret { var: String },
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub library: LibraryConfig,
    pub store: StoreConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding the HS256 token signing secret.
    pub jwt_secret_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: "TEMPLATE_LIBRARY_JWT_SECRET".to_string(),
        }
    }
}

impl AuthConfig {
    pub fn jwt_secret(&self) -> Result<SecretString, ConfigError> {
        read_secret(&self.jwt_secret_env)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// E-mails of template library admins.
    pub admins: Vec<String>,

    /// Base URL used to build template links in notifications.
    pub console_base_url: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            console_base_url: "https://console.example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub project_id: String,
    pub transaction_max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: "template-library".to_string(),
            transaction_max_attempts: RetryPolicy::default().max_attempts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub policy: NotificationPolicy,

    /// Notifications are only logged when no webhook is configured.
    pub webhook_url: Option<String>,

    /// Environment variable holding the webhook signing secret.
    pub webhook_secret_env: String,

    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            policy: NotificationPolicy::default(),
            webhook_url: None,
            webhook_secret_env: "TEMPLATE_LIBRARY_WEBHOOK_SECRET".to_string(),
            timeout_secs: 10,
        }
    }
}

impl NotificationConfig {
    pub fn webhook_secret(&self) -> Result<SecretString, ConfigError> {
        read_secret(&self.webhook_secret_env)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,

    /// Default `EnvFilter` directive.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration file named by `TEMPLATE_LIBRARY_CONFIG` and applies environment
    /// overrides.
    ///
    /// A missing default file is not an error. A missing file that was named explicitly is.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `API_HOST`, `API_PORT` and `RUST_LOG`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                message: format!("'{port}' is not a valid port"),
            })?;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            port: self.server.port,
            host: self.server.host.clone(),
            request_timeout: Duration::from_secs(self.server.request_timeout_secs),
        }
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            retry: RetryPolicy::new(self.store.transaction_max_attempts),
            notification_policy: self.notifications.policy,
        }
    }
}

fn read_secret(var: &str) -> Result<SecretString, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
        _ => Err(ConfigError::MissingSecret {
            var: var.to_string(),
        }),
    }
}

//! Runtime configuration from environment variables.
//!
//! # Responsibility
//! - Read `BACKOFFICE_*` variables, optionally seeded from a `.env` file.
//! - Validate values once so callers can trust them.
//!
//! # Invariants
//! - `log_dir`, when set, is absolute.
//! - `reveal_ttl_ms` is positive.
//! - `functions_url`, when set, is an http(s) URL without trailing slash.

use crate::logging::default_log_level;
use crate::vault::reveal::DEFAULT_REVEAL_TTL_MS;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "BACKOFFICE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BACKOFFICE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BACKOFFICE_LOG_DIR";
pub const ENV_FUNCTIONS_URL: &str = "BACKOFFICE_FUNCTIONS_URL";
pub const ENV_API_KEY: &str = "BACKOFFICE_API_KEY";
pub const ENV_VAULT_FUNCTION: &str = "BACKOFFICE_VAULT_FUNCTION";
pub const ENV_REVEAL_TTL_SECS: &str = "BACKOFFICE_REVEAL_TTL_SECS";

const DEFAULT_DB_FILE_NAME: &str = "backoffice.sqlite3";
const DEFAULT_VAULT_FUNCTION: &str = "vault-crypto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting {key}"),
            Self::Invalid { key, message } => write!(f, "invalid {key}: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Endpoint settings for the hosted vault crypto function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFunctionSettings<'a> {
    pub functions_url: &'a str,
    pub function_name: &'a str,
    pub api_key: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackofficeConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub functions_url: Option<String>,
    pub api_key: Option<String>,
    pub vault_function: String,
    pub reveal_ttl_ms: i64,
}

impl Default for BackofficeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            functions_url: None,
            api_key: None,
            vault_function: DEFAULT_VAULT_FUNCTION.to_string(),
            reveal_ttl_ms: DEFAULT_REVEAL_TTL_MS,
        }
    }
}

impl BackofficeConfig {
    /// Loads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenv::dotenv() {
            log::debug!("event=config_load module=config status=skip dotenv_error={err}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    key: ENV_LOG_DIR,
                    message: format!("`{}` is not an absolute path", dir.display()),
                });
            }
            config.log_dir = Some(dir);
        }
        if let Some(url) = get(ENV_FUNCTIONS_URL) {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Invalid {
                    key: ENV_FUNCTIONS_URL,
                    message: format!("`{url}` is not an http(s) URL"),
                });
            }
            config.functions_url = Some(url.trim_end_matches('/').to_string());
        }
        config.api_key = get(ENV_API_KEY);
        if let Some(name) = get(ENV_VAULT_FUNCTION) {
            config.vault_function = name;
        }
        if let Some(raw) = get(ENV_REVEAL_TTL_SECS) {
            config.reveal_ttl_ms = parse_ttl_secs(&raw)?;
        }

        Ok(config)
    }

    /// Returns the vault function endpoint, failing if URL or key is unset.
    pub fn vault_function(&self) -> Result<VaultFunctionSettings<'_>, ConfigError> {
        let functions_url = self
            .functions_url
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_FUNCTIONS_URL))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_API_KEY))?;
        Ok(VaultFunctionSettings {
            functions_url,
            function_name: &self.vault_function,
            api_key,
        })
    }
}

fn parse_ttl_secs(raw: &str) -> Result<i64, ConfigError> {
    match raw.parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(secs.saturating_mul(1_000)),
        _ => Err(ConfigError::Invalid {
            key: ENV_REVEAL_TTL_SECS,
            message: format!("`{raw}` is not a positive number of seconds"),
        }),
    }
}

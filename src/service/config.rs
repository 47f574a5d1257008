//! Connection settings for the external backend service.
//!
//! Resolution order:
//! 1. `KAWAII_SERVICE_CONFIG` environment variable (JSON object)
//! 2. `KAWAII_APP_ID`, `KAWAII_API_KEY`, `KAWAII_PROJECT_ID`,
//!    `KAWAII_STORAGE_BUCKET`, `KAWAII_SENDER_ID` environment variables
//! 3. JSON file: an explicit path, or `~/.kawaii-doodle/service.json`
//!
//! No configuration at all is not an error; the app then runs without the
//! service.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tags;

/// JSON-encoded [`ServiceConfig`]
pub const SERVICE_CONFIG_ENV: &str = "KAWAII_SERVICE_CONFIG";
pub const APP_ID_ENV: &str = "KAWAII_APP_ID";
pub const API_KEY_ENV: &str = "KAWAII_API_KEY";
pub const PROJECT_ID_ENV: &str = "KAWAII_PROJECT_ID";
pub const STORAGE_BUCKET_ENV: &str = "KAWAII_STORAGE_BUCKET";
pub const SENDER_ID_ENV: &str = "KAWAII_SENDER_ID";

/// Directory under the home directory holding the config file
const CONFIG_DIR_NAME: &str = ".kawaii-doodle";
const CONFIG_FILE_NAME: &str = "service.json";

/// A configuration field failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{0}` must not be empty")]
    EmptyField(&'static str),
}

/// The five opaque identifiers the backend SDK needs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub application_id: String,
    pub api_key: String,
    pub project_id: String,
    pub storage_bucket: String,
    #[serde(alias = "gcmSenderId")]
    pub sender_id: String,
}

impl ServiceConfig {
    /// Check that every field is non-empty.
    ///
    /// Reports the first empty field by its JSON name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("applicationId", &self.application_id),
            ("apiKey", &self.api_key),
            ("projectId", &self.project_id),
            ("storageBucket", &self.storage_bucket),
            ("senderId", &self.sender_id),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(name));
            }
        }
        Ok(())
    }
}

// The API key stays out of logs
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("application_id", &self.application_id)
            .field("api_key", &mask(&self.api_key))
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("sender_id", &self.sender_id)
            .finish()
    }
}

fn mask(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "***".to_string()
    } else {
        format!("{}***", prefix)
    }
}

/// Where a resolved configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `KAWAII_SERVICE_CONFIG`
    EnvJson,
    /// The individual `KAWAII_*` variables
    EnvFields,
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::EnvJson => write!(f, "{} environment variable", SERVICE_CONFIG_ENV),
            ConfigSource::EnvFields => write!(f, "KAWAII_* environment variables"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A configuration together with its origin.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ServiceConfig,
    pub source: ConfigSource,
}

/// Default config file location, `~/.kawaii-doodle/service.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Resolve the service configuration.
///
/// `config_path` overrides the default file location; an explicit path that
/// does not exist is an error, a missing default file is not.
pub fn load_service_config(config_path: Option<&Path>) -> Result<Option<ResolvedConfig>> {
    if let Ok(raw) = std::env::var(SERVICE_CONFIG_ENV) {
        match serde_json::from_str::<ServiceConfig>(&raw) {
            Ok(config) => {
                info!("Using service config from {} environment variable", SERVICE_CONFIG_ENV);
                return Ok(Some(ResolvedConfig {
                    config,
                    source: ConfigSource::EnvJson,
                }));
            }
            Err(e) => warn!(target: tags::JSON, "Failed to parse {}: {}", SERVICE_CONFIG_ENV, e),
        }
    }

    if let Some(config) = config_from_env_fields() {
        info!("Using service config from KAWAII_* environment variables");
        return Ok(Some(ResolvedConfig {
            config,
            source: ConfigSource::EnvFields,
        }));
    }

    let (path, explicit) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => {
                debug!("Could not determine home directory; no service config file");
                return Ok(None);
            }
        },
    };

    if !path.exists() {
        if explicit {
            anyhow::bail!("Service config file not found: {:?}", path);
        }
        debug!("No service config at {:?}", path);
        return Ok(None);
    }

    let config = read_config_file(&path)?;
    info!("Using service config from {:?}", path);
    Ok(Some(ResolvedConfig {
        config,
        source: ConfigSource::File(path),
    }))
}

/// Read a JSON config file.
pub fn read_config_file(path: &Path) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read service config file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse service config file: {:?}", path))
}

fn config_from_env_fields() -> Option<ServiceConfig> {
    Some(ServiceConfig {
        application_id: std::env::var(APP_ID_ENV).ok()?,
        api_key: std::env::var(API_KEY_ENV).ok()?,
        project_id: std::env::var(PROJECT_ID_ENV).ok()?,
        storage_bucket: std::env::var(STORAGE_BUCKET_ENV).ok()?,
        sender_id: std::env::var(SENDER_ID_ENV).ok()?,
    })
}

#[cfg(test)]
pub(crate) fn sample_config() -> ServiceConfig {
    ServiceConfig {
        application_id: "1:338129743756:android:8eabbade845ac4c68170a9".to_string(),
        api_key: "AIzaSyTestKey".to_string(),
        project_id: "kawaii-doodle-97054".to_string(),
        storage_bucket: "kawaii-doodle-97054.firebasestorage.app".to_string(),
        sender_id: "338129743756".to_string(),
    }
}

//! Configuration loading, validation, and secret resolution for Threadline.
//!
//! Settings come from a `secrets.toml` file (the deployment's secret store)
//! with environment variables filling anything the file leaves empty. The
//! binary loads a `.env` file into the environment before this runs, so a
//! local `.env` behaves like any other environment source.
//!
//! | Setting            | File key          | Environment variable   |
//! |--------------------|-------------------|------------------------|
//! | API key            | `api_key`         | `AZURE_OAI_KEY`        |
//! | API endpoint       | `endpoint`        | `AZURE_OAI_ENDPOINT`   |
//! | Weather API key    | `weather_api_key` | `OPENWEATHER_API_KEY`  |
//! | Model              | `model`           | `THREADLINE_MODEL`     |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "AZURE_OAI_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_OAI_ENDPOINT";
pub const ENV_WEATHER_KEY: &str = "OPENWEATHER_API_KEY";
pub const ENV_MODEL: &str = "THREADLINE_MODEL";

/// File name of the secrets file searched for in the config directories.
pub const SECRETS_FILE: &str = "secrets.toml";

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Assistant service API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Assistant service endpoint (e.g. `https://my-resource.openai.azure.com`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Weather provider API key; without it the weather and time tools always fail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,

    /// Which wire flavour to speak: "azure" or "openai"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Azure `api-version` query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Model (Azure deployment name) backing the assistant
    #[serde(default = "default_model")]
    pub model: String,

    /// Delay between run status checks, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Document uploaded once at startup for later retrieval, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_document: Option<PathBuf>,

    /// Where generated images and files are written
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Remote assistant definition
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

fn default_backend() -> String {
    "azure".into()
}
fn default_api_version() -> String {
    "2024-05-01-preview".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("weather_api_key", &redact(&self.weather_api_key))
            .field("backend", &self.backend)
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("reference_document", &self.reference_document)
            .field("download_dir", &self.download_dir)
            .field("assistant", &self.assistant)
            .field("weather", &self.weather)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub name: String,

    #[serde(default = "default_instructions")]
    pub instructions: String,
}

fn default_assistant_name() -> String {
    "Threadline Multi-Modal Assistant".into()
}
fn default_instructions() -> String {
    "You are a data specialist with vision capabilities. When given an image, describe \
     what it shows. When given a data file, analyze it. Use the weather and time \
     functions when the user asks about a place."
        .into()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            instructions: default_instructions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the OpenWeatherMap-compatible API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

fn default_weather_base_url() -> String {
    "http://api.openweathermap.org".into()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration: secrets file first, environment for the gaps.
    ///
    /// `explicit` overrides secrets-file discovery. A missing explicit file
    /// is an error; a missing discovered file just means "use defaults".
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as [`AppConfig::load`], without the final validation.
    pub fn load_unvalidated(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    reason: "file does not exist".into(),
                });
            }
            Some(path) => Self::load_from(path)?,
            None => match Self::discover_secrets_file() {
                Some(path) => Self::load_from(&path)?,
                None => {
                    tracing::info!("No {SECRETS_FILE} found, using environment only");
                    Self::default()
                }
            },
        };

        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a specific file path, without validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "Loaded secrets file");
        Ok(config)
    }

    /// Fill unset secrets (and the model override) from an environment lookup.
    ///
    /// Values already present in the file win. Empty strings count as unset
    /// on both sides.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        self.api_key = non_empty(self.api_key).or_else(|| env(ENV_API_KEY));
        self.endpoint = non_empty(self.endpoint).or_else(|| env(ENV_ENDPOINT));
        self.weather_api_key = non_empty(self.weather_api_key).or_else(|| env(ENV_WEATHER_KEY));

        if let Some(model) = env(ENV_MODEL) {
            self.model = model;
        }

        self
    }

    /// Candidate secrets files, in search order.
    pub fn secrets_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(".threadline").join(SECRETS_FILE));
        }
        paths.push(Self::config_dir().join(SECRETS_FILE));
        paths
    }

    /// The secrets file `load` would read, if any.
    pub fn locate_secrets_file(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => path.exists().then(|| path.to_path_buf()),
            None => Self::discover_secrets_file(),
        }
    }

    fn discover_secrets_file() -> Option<PathBuf> {
        Self::secrets_search_paths().into_iter().find(|p| p.exists())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".threadline")
    }

    /// Validate the configuration.
    ///
    /// A missing API key (or endpoint, for Azure) is fatal. A missing weather
    /// key is not; the tools degrade to their error answer instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            return Err(ConfigError::MissingSecret(ENV_API_KEY));
        }

        match self.backend.as_str() {
            "azure" => {
                if self.endpoint.is_none() {
                    return Err(ConfigError::MissingSecret(ENV_ENDPOINT));
                }
            }
            "openai" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "backend must be \"azure\" or \"openai\", got \"{other}\""
                )));
            }
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        if self.weather_api_key.is_none() {
            tracing::warn!(
                "{ENV_WEATHER_KEY} is not set; weather and time lookups will report \"City not found\""
            );
        }

        Ok(())
    }

    /// Whether weather lookups can succeed at all.
    pub fn weather_enabled(&self) -> bool {
        self.weather_api_key.is_some()
    }

    /// The poll interval as a Duration.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            weather_api_key: None,
            backend: default_backend(),
            api_version: default_api_version(),
            model: default_model(),
            poll_interval_ms: default_poll_interval_ms(),
            reference_document: None,
            download_dir: default_download_dir(),
            assistant: AssistantConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Required secret {0} is not set (secrets.toml or environment)")]
    MissingSecret(&'static str),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

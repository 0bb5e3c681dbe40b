use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const QUEUE_URL_VAR: &str = "QUEUE_URL";
/// Older deployments named the queue variable after the service.
pub const LEGACY_QUEUE_URL_VAR: &str = "SQS_URL";
pub const BUCKET_NAME_VAR: &str = "BUCKET_NAME";
pub const AWS_PROFILE_VAR: &str = "AWS_PROFILE";
pub const AWS_REGION_VAR: &str = "AWS_REGION";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSettings {
    /// Named profile from the shared AWS config; the default chain otherwise
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub region: Option<String>,
}

/// Destinations and client settings, built once per process and handed to
/// the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub queue_url: String,

    #[serde(default)]
    pub bucket_name: String,

    #[serde(default)]
    pub aws: AwsSettings,
}

impl RelayConfig {
    pub fn new(queue_url: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            bucket_name: bucket_name.into(),
            aws: AwsSettings::default(),
        }
    }

    /// Build from process environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML settings file without validating it
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings file (explicit path, else ~/.tyspeak/settings.toml if it
    /// exists) overlaid with environment variables, then validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None => match Self::default_settings_path() {
                Some(default_path) if default_path.exists() => Self::from_path(&default_path)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Non-empty variables win over whatever is already set
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(queue_url) = get(QUEUE_URL_VAR).or_else(|| get(LEGACY_QUEUE_URL_VAR)) {
            self.queue_url = queue_url;
        }
        if let Some(bucket_name) = get(BUCKET_NAME_VAR) {
            self.bucket_name = bucket_name;
        }
        if let Some(profile) = get(AWS_PROFILE_VAR) {
            self.aws.profile = Some(profile);
        }
        if let Some(region) = get(AWS_REGION_VAR) {
            self.aws.region = Some(region);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_url.trim().is_empty() {
            return Err(ConfigError::Missing(QUEUE_URL_VAR));
        }
        if self.bucket_name.trim().is_empty() {
            return Err(ConfigError::Missing(BUCKET_NAME_VAR));
        }
        Ok(())
    }

    /// Get the default settings path (~/.tyspeak/settings.toml)
    pub fn default_settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".tyspeak").join("settings.toml"))
    }
}

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_MODEL: &str = "whisper-1";
pub const DEFAULT_MAX_WORDS: usize = 10;

const API_KEY_ENV_VARS: [&str; 2] = ["SRT_EXTRACT_API_KEY", "OPENAI_API_KEY"];

/// Failures while locating, reading or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: max_words must be at least 1")]
    InvalidMaxWords,
}

/// Settings read from `config.toml`; every key is optional.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub language: Option<String>,
    pub max_words: usize,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            language: None,
            max_words: DEFAULT_MAX_WORDS,
            timeout_secs: 3600, // Long uploads
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the platform config dir when `path` is `None`.
    ///
    /// A missing file yields defaults. The API key falls back to the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::get_config_path()?,
        };

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
            Self::from_toml(&content).map_err(|err| match err {
                ConfigError::Parse { source, .. } => ConfigError::Parse {
                    path: config_path.clone(),
                    source,
                },
                other => other,
            })?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        if config.max_words == 0 {
            return Err(ConfigError::InvalidMaxWords);
        }
        Ok(config)
    }

    /// Fill an empty API key from the first set environment variable.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if !self.api_key.trim().is_empty() {
            return;
        }
        if let Some(key) = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
        {
            self.api_key = key;
        }
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("com", "srt-extract", "srt-extract")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

//! Configuration file loading and parsing.

use crate::types::BulwarkConfig;
use bulwark_common_log::{LogFormat, LogLevel};
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location of the configuration file relative to the project directory.
pub const CONFIG_FILE: &str = ".bulwark/audit.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the configuration file this loader reads.
    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_FILE)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load(&self) -> Result<BulwarkConfig, ConfigError> {
        let config_path = self.config_path();

        if !config_path.exists() {
            return Ok(BulwarkConfig::default());
        }

        self.load_file(&config_path)
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_file(&self, path: &Path) -> Result<BulwarkConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let expanded = self.expand_env_vars(&contents)?;

        let config: BulwarkConfig =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        validate(&config)?;
        Ok(config)
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    /// Save configuration to file.
    pub fn save(&self, config: &BulwarkConfig) -> Result<(), ConfigError> {
        let config_path = self.config_path();
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(config_path, yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Validate configuration values.
pub fn validate(config: &BulwarkConfig) -> Result<(), ConfigError> {
    let audit = &config.audit;
    if audit.payload_limit_bytes == 0 {
        return Err(ConfigError::invalid("audit.payload_limit_bytes must be greater than 0"));
    }
    if audit.preview_limit_bytes == 0 {
        return Err(ConfigError::invalid("audit.preview_limit_bytes must be greater than 0"));
    }
    if audit.max_depth == 0 {
        return Err(ConfigError::invalid("audit.max_depth must be greater than 0"));
    }
    validate_date_format(&audit.date_format)?;

    if config.dispatcher.workers == 0 {
        return Err(ConfigError::invalid("dispatcher.workers must be greater than 0"));
    }
    if config.dispatcher.queue_capacity == 0 {
        return Err(ConfigError::invalid("dispatcher.queue_capacity must be greater than 0"));
    }

    if LogLevel::parse(&config.logging.level).is_none() {
        return Err(ConfigError::invalid(format!(
            "logging.level '{}' is not one of trace, debug, info, warn, error",
            config.logging.level
        )));
    }
    if LogFormat::parse(&config.logging.format).is_none() {
        return Err(ConfigError::invalid(format!(
            "logging.format '{}' is not one of pretty, compact, json",
            config.logging.format
        )));
    }

    Ok(())
}

/// Reject empty formats and formats chrono cannot render.
pub fn validate_date_format(format: &str) -> Result<(), ConfigError> {
    if format.trim().is_empty() {
        return Err(ConfigError::invalid("audit.date_format must not be empty"));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::invalid(format!(
            "audit.date_format '{}' is not a valid strftime format",
            format
        )));
    }
    Ok(())
}

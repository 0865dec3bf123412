//! Environment variable handling.

use crate::types::BulwarkConfig;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("required environment variable not set: {var}")]
    NotSet { var: String },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to read {path}: {message}")]
    File { path: PathBuf, message: String },
}

/// Environment variable names.
pub mod vars {
    pub const BULWARK_ENV: &str = "BULWARK_ENV";

    // Audit
    pub const BULWARK_AUDIT_PAYLOAD_LIMIT: &str = "BULWARK_AUDIT_PAYLOAD_LIMIT";
    pub const BULWARK_AUDIT_PREVIEW_LIMIT: &str = "BULWARK_AUDIT_PREVIEW_LIMIT";

    // Dispatcher
    pub const BULWARK_DISPATCH_WORKERS: &str = "BULWARK_DISPATCH_WORKERS";
    pub const BULWARK_DISPATCH_QUEUE: &str = "BULWARK_DISPATCH_QUEUE";

    // Logging
    pub const BULWARK_LOG_LEVEL: &str = "BULWARK_LOG_LEVEL";
    pub const BULWARK_LOG_FORMAT: &str = "BULWARK_LOG_FORMAT";
    pub const BULWARK_LOG_FILE: &str = "BULWARK_LOG_FILE";
    pub const BULWARK_AUDIT_LOG_FILE: &str = "BULWARK_AUDIT_LOG_FILE";
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from .env files in the current directory.
    pub fn init() -> Result<Self, EnvError> {
        let dir = env::current_dir().map_err(|e| EnvError::File {
            path: PathBuf::from("."),
            message: e.to_string(),
        })?;
        Self::init_in(dir)
    }

    /// Initialize environment from .env files in `dir`.
    ///
    /// Reads `.env.local`, then `.env.{BULWARK_ENV}`, then `.env`. A variable
    /// that is already set is never replaced, so the process environment
    /// wins over every file and earlier files win over later ones. Missing
    /// files are skipped.
    pub fn init_in(dir: impl AsRef<Path>) -> Result<Self, EnvError> {
        let dir = dir.as_ref();
        load_dotenv(&dir.join(".env.local"))?;
        if let Ok(name) = env::var(vars::BULWARK_ENV) {
            load_dotenv(&dir.join(format!(".env.{}", name)))?;
        }
        load_dotenv(&dir.join(".env"))?;

        Ok(Self { _guard: () })
    }

    /// Get a required string variable.
    pub fn require(var: &str) -> Result<String, EnvError> {
        env::var(var).map_err(|_| EnvError::NotSet { var: var.to_string() })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: format!("expected integer, got '{}'", v),
            }),
            Err(_) => Ok(None),
        }
    }

    /// Overlay `BULWARK_*` variables on a loaded configuration.
    pub fn apply_overrides(config: &mut BulwarkConfig) -> Result<(), EnvError> {
        if let Some(limit) = Self::get_int(vars::BULWARK_AUDIT_PAYLOAD_LIMIT)? {
            config.audit.payload_limit_bytes = limit;
        }
        if let Some(limit) = Self::get_int(vars::BULWARK_AUDIT_PREVIEW_LIMIT)? {
            config.audit.preview_limit_bytes = limit;
        }
        if let Some(workers) = Self::get_int(vars::BULWARK_DISPATCH_WORKERS)? {
            config.dispatcher.workers = workers;
        }
        if let Some(capacity) = Self::get_int(vars::BULWARK_DISPATCH_QUEUE)? {
            config.dispatcher.queue_capacity = capacity;
        }
        if let Some(level) = Self::get(vars::BULWARK_LOG_LEVEL) {
            config.logging.level = level;
        }
        if let Some(format) = Self::get(vars::BULWARK_LOG_FORMAT) {
            config.logging.format = format;
        }
        if let Some(file) = Self::get(vars::BULWARK_LOG_FILE) {
            config.logging.file = Some(file.into());
        }
        if let Some(file) = Self::get(vars::BULWARK_AUDIT_LOG_FILE) {
            config.logging.audit_file = Some(file.into());
        }
        Ok(())
    }
}

fn load_dotenv(path: &Path) -> Result<(), EnvError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(EnvError::File {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

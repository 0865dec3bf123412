//! Configuration for Bulwark.
//!
//! Settings are read from `.bulwark/audit.yaml` (with `${VAR}` expansion),
//! then `BULWARK_*` environment variables, including those from `.env`
//! files in the project directory, are layered on top.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;

use std::path::Path;

/// Errors from [`load`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Load the project configuration, apply environment overrides and validate
/// the result.
pub fn load(project_dir: impl AsRef<Path>) -> Result<BulwarkConfig, LoadError> {
    let project_dir = project_dir.as_ref();
    Environment::init_in(project_dir)?;
    let mut config = ConfigLoader::new(project_dir).load()?;
    Environment::apply_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Serializes tests that set `BULWARK_*` variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

//! Configuration types.

use bulwark_common_log::{LogConfig, LogFormat, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default byte limit for binary payloads and previews.
pub const DEFAULT_PAYLOAD_LIMIT_BYTES: usize = 1024;

/// Default timestamp format: millisecond precision with a numeric offset.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BulwarkConfig {
    /// Audit serialization settings.
    pub audit: AuditConfig,
    /// Async dispatcher settings.
    pub dispatcher: DispatcherConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Audit serialization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Binary payloads larger than this are replaced by a placeholder of this size.
    pub payload_limit_bytes: usize,
    /// How many bytes of a request body are read for a preview.
    pub preview_limit_bytes: usize,
    /// Field names never written to the audit trail (case-insensitive).
    pub excluded_fields: Vec<String>,
    /// strftime-style format for timestamps.
    pub date_format: String,
    /// What happens to payloads at or under the limit.
    pub under_limit_policy: UnderLimitPolicy,
    /// Nesting depth past which values render as null.
    pub max_depth: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            payload_limit_bytes: DEFAULT_PAYLOAD_LIMIT_BYTES,
            preview_limit_bytes: DEFAULT_PAYLOAD_LIMIT_BYTES,
            excluded_fields: vec!["logger".to_string()],
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            under_limit_policy: UnderLimitPolicy::default(),
            max_depth: 64,
        }
    }
}

/// Treatment of binary payloads that do not exceed the limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderLimitPolicy {
    /// Keep the payload unchanged.
    #[default]
    PassThrough,
    /// Remove the payload from the container.
    Drop,
}

/// Async dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of worker queues.
    pub workers: usize,
    /// Capacity of each worker queue.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 10_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error.
    pub level: String,
    /// pretty, compact or json.
    pub format: String,
    /// Mirror all output to this file.
    pub file: Option<PathBuf>,
    /// Dedicated file for audit records.
    pub audit_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
            audit_file: None,
        }
    }
}

impl LoggingConfig {
    /// Build the logging bootstrap configuration.
    ///
    /// Unknown level or format strings fall back to the defaults; the loader
    /// rejects them before this point.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: LogLevel::parse(&self.level).unwrap_or_default(),
            format: LogFormat::parse(&self.format).unwrap_or_default(),
            file_path: self.file.clone(),
            audit_file_path: self.audit_file.clone(),
            ..LogConfig::default()
        }
    }
}

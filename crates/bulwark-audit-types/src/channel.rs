//! Severity-routed audit channels.

use bulwark_common_core::MessageSeverity;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Log channel an audit record is written to.
///
/// Channels are independent streams; ordering is only kept within one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuditChannel {
    Info,
    Warn,
    Error,
}

impl AuditChannel {
    /// Channel for a severity. ERROR and FATAL share the error channel;
    /// DEBUG and TRACE go to info.
    pub fn for_severity(severity: MessageSeverity) -> Self {
        match severity {
            MessageSeverity::Error | MessageSeverity::Fatal => Self::Error,
            MessageSeverity::Warn => Self::Warn,
            MessageSeverity::Info | MessageSeverity::Debug | MessageSeverity::Trace => Self::Info,
        }
    }

    /// Whether records on this channel carry the originating cause.
    pub fn records_cause(&self) -> bool {
        matches!(self, Self::Error)
    }
}

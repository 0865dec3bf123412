//! Capture errors.

use bulwark_audit_serialize::RenderError;
use bulwark_audit_types::AuditChannel;
use bulwark_common_core::RuntimeFault;
use thiserror::Error;

/// A sink could not accept a record.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("audit sink rejected record on {channel} channel: {reason}")]
    Rejected { channel: AuditChannel, reason: String },

    #[error("audit sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A record could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("audit queue is full")]
    Full,

    #[error("audit dispatcher is shut down")]
    Closed,
}

/// Errors surfaced to callers of the audit facade.
#[derive(Debug, Error)]
pub enum AuditError {
    /// An internal failure that was audited; propagate it.
    #[error(transparent)]
    Fault(RuntimeFault),

    /// An internal failure that could not even be audited.
    #[error("{advice} - failure occurred while attempting to write the audit error record")]
    Unauditable {
        advice: String,
        fault: RuntimeFault,
        #[source]
        source: SinkError,
    },

    #[error("invalid audit configuration: {0}")]
    Render(#[from] RenderError),

    #[error("no Tokio runtime to run audit workers on: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

impl AuditError {
    /// The fault behind this error, if it came from internal failure handling.
    pub fn fault(&self) -> Option<&RuntimeFault> {
        match self {
            Self::Fault(fault) | Self::Unauditable { fault, .. } => Some(fault),
            _ => None,
        }
    }
}

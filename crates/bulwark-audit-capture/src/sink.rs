//! Audit record sinks.

use crate::error::SinkError;
use bulwark_audit_types::{AuditCause, AuditChannel, AuditEvent};
use bulwark_common_log::AUDIT_TARGET;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// What a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Rendered audit data or a service message.
    Payload,
    /// Report of a rendering tier that failed for a payload.
    Diagnostic,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Payload => "payload",
            Self::Diagnostic => "diagnostic",
        })
    }
}

/// One entry in the audit trail.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub channel: AuditChannel,
    pub kind: RecordKind,
    pub event: AuditEvent,
    pub details: String,
    /// Only ever set on the error channel.
    pub cause: Option<AuditCause>,
}

impl AuditRecord {
    /// Payload record; the cause is kept only if the channel records causes.
    pub fn payload(channel: AuditChannel, event: AuditEvent, details: String, cause: Option<AuditCause>) -> Self {
        Self {
            channel,
            kind: RecordKind::Payload,
            event,
            details,
            cause: cause.filter(|_| channel.records_cause()),
        }
    }

    /// Error-channel record describing a rendering failure.
    pub fn diagnostic(event: AuditEvent, details: String, cause: AuditCause) -> Self {
        Self {
            channel: AuditChannel::Error,
            kind: RecordKind::Diagnostic,
            event,
            details,
            cause: Some(cause),
        }
    }
}

/// Destination of audit records.
///
/// Writes happen on audit worker threads, never on the caller's path, so a
/// sink may block.
pub trait AuditSink: Send + Sync {
    /// Persist one record. An error loses only this record.
    fn write(&self, record: &AuditRecord) -> Result<(), SinkError>;
}

/// Writes records as `tracing` events on the audit target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn write(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let event = &record.event;
        match (record.channel, &record.cause) {
            (AuditChannel::Info, _) => info!(
                target: AUDIT_TARGET,
                event = %event.event(),
                activity = event.activity(),
                audited = event.audited(),
                event_id = %event.id(),
                kind = %record.kind,
                "{}",
                record.details
            ),
            (AuditChannel::Warn, _) => warn!(
                target: AUDIT_TARGET,
                event = %event.event(),
                activity = event.activity(),
                audited = event.audited(),
                event_id = %event.id(),
                kind = %record.kind,
                "{}",
                record.details
            ),
            (AuditChannel::Error, Some(cause)) => error!(
                target: AUDIT_TARGET,
                event = %event.event(),
                activity = event.activity(),
                audited = event.audited(),
                event_id = %event.id(),
                kind = %record.kind,
                error = %cause,
                "{}",
                record.details
            ),
            (AuditChannel::Error, None) => error!(
                target: AUDIT_TARGET,
                event = %event.event(),
                activity = event.activity(),
                audited = event.audited(),
                event_id = %event.id(),
                kind = %record.kind,
                "{}",
                record.details
            ),
        }
        Ok(())
    }
}

/// Keeps every record in memory. Useful in tests and for inspection.
#[derive(Debug)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
    written: watch::Sender<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        let (written, _) = watch::channel(0);
        Self {
            records: Mutex::new(Vec::new()),
            written,
        }
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        *self.written.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` records have been written.
    pub async fn wait_for(&self, count: usize) -> Vec<AuditRecord> {
        let mut written = self.written.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = written.wait_for(|n| *n >= count).await;
        self.records()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemorySink {
    fn write(&self, record: &AuditRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Unavailable("memory sink lock poisoned".to_string()))?
            .push(record.clone());
        self.written.send_modify(|n| *n += 1);
        Ok(())
    }
}

//! Asynchronous audit capture for Bulwark.
//!
//! Request and response interceptors call [`AsyncAudit`], which hands each
//! record to the [`AuditDispatcher`] and returns at once. Workers render the
//! data with the tiered serializer and write it to an [`AuditSink`] on the
//! channel matching its severity.
//!
//! - Non-blocking submission with bounded per-worker queues
//! - Submission order kept per correlation id, or per thread without one
//! - Rendering failures reported as error-channel diagnostics
//! - Bounded body previews

mod dispatcher;
mod error;
mod facade;
mod partner;
mod preview;
mod sink;

pub use dispatcher::AuditDispatcher;
pub use error::{AuditError, DispatchError, SinkError};
pub use facade::AsyncAudit;
pub use partner::{ws_message_prefix, WsAuditStage, WsMessageKind};
pub use preview::{read_bounded_preview, read_bounded_preview_async};
pub use sink::{AuditRecord, AuditSink, MemorySink, RecordKind, TracingSink};

// Re-export types for convenience
pub use bulwark_audit_types::{
    AuditCause, AuditChannel, AuditEvent, AuditEvents, AuditValue, AuditableData, MessageSeverity,
    RequestAuditData, ResponseAuditData,
};

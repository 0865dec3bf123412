//! Audit facade used by request/response interceptors.

use crate::dispatcher::AuditDispatcher;
use crate::error::AuditError;
use crate::preview;
use crate::sink::{AuditRecord, AuditSink};
use bulwark_audit_serialize::AuditSerializer;
use bulwark_audit_types::{
    AuditCause, AuditChannel, AuditEvent, AuditValue, AuditableData, MessageSeverity,
    RequestAuditData, ResponseAuditData,
};
use bulwark_common_config::BulwarkConfig;
use bulwark_common_core::{FaultCause, FaultStatus, MessageKey, RuntimeFault};
use std::error::Error as StdError;
use std::io::Read;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::error;

/// Entry point for writing audit records.
///
/// Every `write_*` method hands the record to the dispatcher and returns
/// immediately; rendering and the sink write happen on audit workers.
pub struct AsyncAudit {
    dispatcher: AuditDispatcher,
    sink: Arc<dyn AuditSink>,
    preview_limit: u64,
}

impl AsyncAudit {
    /// Build the renderer and start the dispatcher on the current runtime.
    pub fn from_config(config: &BulwarkConfig, sink: Arc<dyn AuditSink>) -> Result<Self, AuditError> {
        let serializer = AuditSerializer::from_audit_config(&config.audit)?;
        let dispatcher = AuditDispatcher::spawn(&config.dispatcher, serializer, Arc::clone(&sink))?;
        Ok(Self {
            dispatcher,
            sink,
            preview_limit: config.audit.preview_limit_bytes as u64,
        })
    }

    pub fn dispatcher(&self) -> &AuditDispatcher {
        &self.dispatcher
    }

    /// Audit an inbound or outbound request.
    pub fn write_request_audit_log(
        &self,
        data: RequestAuditData,
        event: AuditEvent,
        severity: MessageSeverity,
        cause: Option<AuditCause>,
    ) {
        self.dispatcher.submit(event, data.into(), severity, cause);
    }

    /// Put `response` into `container` and audit it. Severity defaults to INFO.
    pub fn write_response_audit_log(
        &self,
        response: impl Into<AuditValue>,
        mut container: ResponseAuditData,
        event: AuditEvent,
        severity: Option<MessageSeverity>,
        cause: Option<AuditCause>,
    ) {
        container.set_response(response);
        self.dispatcher.submit(
            event,
            container.into(),
            severity.unwrap_or(MessageSeverity::Info),
            cause,
        );
    }

    /// Audit arbitrary data.
    pub fn write_audit_log(
        &self,
        data: AuditableData,
        event: AuditEvent,
        severity: MessageSeverity,
        cause: Option<AuditCause>,
    ) {
        self.dispatcher.submit(event, data, severity, cause);
    }

    /// Audit text that is already rendered.
    pub fn write_message_audit_log(
        &self,
        message: impl Into<String>,
        event: AuditEvent,
        severity: MessageSeverity,
        cause: Option<AuditCause>,
    ) {
        self.dispatcher.submit_message(event, message.into(), severity, cause);
    }

    /// Preview of a body, capped at the configured preview limit.
    pub fn read_bounded_preview<R: Read>(&self, reader: R) -> String {
        preview::read_bounded_preview(reader, self.preview_limit)
    }

    pub async fn read_bounded_preview_async<R: AsyncRead + Unpin>(&self, reader: R) -> String {
        preview::read_bounded_preview_async(reader, self.preview_limit).await
    }

    /// Record a failure of the audit machinery itself.
    ///
    /// Logs the failure, writes one record straight to the error channel and
    /// returns the fault for the caller to propagate. If that write fails the
    /// returned error is [`AuditError::Unauditable`].
    pub fn handle_internal_exception<E>(
        &self,
        advice: &str,
        attempting_to: &str,
        event: AuditEvent,
        key: MessageKey,
        error: E,
    ) -> AuditError
    where
        E: StdError + Send + Sync + 'static,
    {
        error!(
            event = %event.event(),
            activity = event.activity(),
            error = %error,
            "{} - Exception occurred while attempting to {}",
            advice,
            attempting_to
        );

        let cause: FaultCause = Arc::new(error);
        let fault = RuntimeFault::new(
            key,
            MessageSeverity::Fatal,
            FaultStatus::InternalServerError,
            [advice, attempting_to],
        )
        .with_cause(cause);

        let record = AuditRecord::payload(
            AuditChannel::Error,
            event,
            format!("Error ServiceMessage: {}", fault),
            Some(AuditCause::from(fault.clone())),
        );
        match self.sink.write(&record) {
            Ok(()) => AuditError::Fault(fault),
            Err(source) => {
                error!(error = %source, "Failed to write audit error record");
                AuditError::Unauditable {
                    advice: advice.to_string(),
                    fault,
                    source,
                }
            }
        }
    }

    /// Wait until everything submitted so far has been written.
    pub async fn flush(&self) {
        self.dispatcher.flush().await;
    }

    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }
}

//! Audit helpers for partner web service calls and cached responses.

use crate::error::AuditError;
use crate::facade::AsyncAudit;
use bulwark_audit_types::{AuditEvent, AuditEvents, AuditValue, MessageSeverity, ResponseAuditData};
use bulwark_common_core::MessageKey;
use std::fmt;

const WS_AUDITED: &str = "WebServiceTemplate";
const CACHE_ACTIVITY: &str = "cacheGet";
const CACHE_ADVICE: &str = "CacheInterceptorInvoke";

/// Point in the SOAP exchange where a message was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsAuditStage {
    /// Before the message is sent, as built.
    Before,
    /// After the exchange, as seen on the wire.
    After,
}

impl WsAuditStage {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Before => "Raw XML",
            Self::After => "Wire Log",
        }
    }
}

impl fmt::Display for WsAuditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Kind of SOAP message being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsMessageKind {
    Request,
    Response,
    Fault,
}

impl WsMessageKind {
    pub fn event(&self) -> AuditEvents {
        match self {
            Self::Request => AuditEvents::PartnerSoapRequest,
            Self::Response => AuditEvents::PartnerSoapResponse,
            Self::Fault => AuditEvents::PartnerSoapFault,
        }
    }

    pub fn activity(&self) -> &'static str {
        match self {
            Self::Request => "webserviceRequest",
            Self::Response => "webserviceResponse",
            Self::Fault => "webserviceResponse_SOAP-FAULT",
        }
    }

    /// Faults go to the error channel.
    pub fn severity(&self) -> MessageSeverity {
        match self {
            Self::Request | Self::Response => MessageSeverity::Info,
            Self::Fault => MessageSeverity::Error,
        }
    }
}

/// Header line put in front of an audited SOAP message.
pub fn ws_message_prefix(stage: WsAuditStage, kind: WsMessageKind) -> String {
    format!("{} -> {} : \n", kind.activity(), stage.title())
}

impl AsyncAudit {
    /// Audit a SOAP message exchanged with a partner.
    pub fn audit_ws_message(&self, stage: WsAuditStage, kind: WsMessageKind, xml: &str) {
        let event = AuditEvent::new(kind.event(), kind.activity(), WS_AUDITED);
        let message = format!("{}{}", ws_message_prefix(stage, kind), xml);
        self.write_message_audit_log(message, event, kind.severity(), None);
    }

    /// Audit a response served from cache.
    ///
    /// The record is queued without waiting. If it cannot be queued the
    /// failure goes through [`handle_internal_exception`](Self::handle_internal_exception)
    /// and is returned.
    pub fn audit_cached_response(&self, audited: &str, value: Option<AuditValue>) -> Result<(), AuditError> {
        let event = AuditEvent::new(AuditEvents::CachedServiceResponse, CACHE_ACTIVITY, audited);
        let mut data = ResponseAuditData::new();
        if let Some(value) = value {
            data.set_response(value);
        }

        self.dispatcher()
            .try_submit(event.clone(), data.into(), MessageSeverity::Info, None)
            .map_err(|e| {
                self.handle_internal_exception(
                    CACHE_ADVICE,
                    CACHE_ADVICE,
                    event,
                    MessageKey::InterceptorException,
                    e,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(WsAuditStage::Before, WsMessageKind::Request, "webserviceRequest -> Raw XML : \n")]
    #[test_case(WsAuditStage::After, WsMessageKind::Response, "webserviceResponse -> Wire Log : \n")]
    #[test_case(WsAuditStage::After, WsMessageKind::Fault, "webserviceResponse_SOAP-FAULT -> Wire Log : \n")]
    fn test_ws_message_prefix(stage: WsAuditStage, kind: WsMessageKind, expected: &str) {
        assert_eq!(ws_message_prefix(stage, kind), expected);
    }

    #[test_case(WsMessageKind::Request, AuditEvents::PartnerSoapRequest, MessageSeverity::Info)]
    #[test_case(WsMessageKind::Response, AuditEvents::PartnerSoapResponse, MessageSeverity::Info)]
    #[test_case(WsMessageKind::Fault, AuditEvents::PartnerSoapFault, MessageSeverity::Error)]
    fn test_ws_message_kind(kind: WsMessageKind, event: AuditEvents, severity: MessageSeverity) {
        assert_eq!(kind.event(), event);
        assert_eq!(kind.severity(), severity);
    }
}

//! Standardized runtime fault.

use crate::messages::{MessageKey, MessageSeverity};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A shareable error cause.
pub type FaultCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Best-fit HTTP status for a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultStatus {
    /// 200
    Ok,
    /// 400
    BadRequest,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 500
    InternalServerError,
    /// 503
    ServiceUnavailable,
}

impl FaultStatus {
    /// Numeric status code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
            Self::ServiceUnavailable => 503,
        }
    }

    /// Reason phrase.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
            Self::ServiceUnavailable => "Service Unavailable",
        }
    }
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// Runtime fault carrying a message key, severity and status.
///
/// Cloning is cheap: the cause is reference counted.
#[derive(Clone, Error)]
#[error("{message}")]
pub struct RuntimeFault {
    key: MessageKey,
    params: Vec<String>,
    message: String,
    severity: MessageSeverity,
    status: FaultStatus,
    #[source]
    cause: Option<FaultCause>,
}

impl RuntimeFault {
    /// Create a fault; the message is rendered from `key` and `params`.
    pub fn new<S: Into<String>>(
        key: MessageKey,
        severity: MessageSeverity,
        status: FaultStatus,
        params: impl IntoIterator<Item = S>,
    ) -> Self {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        let message = key.message(&params);
        Self {
            key,
            params,
            message,
            severity,
            status,
            cause: None,
        }
    }

    /// Attach the error that caused this fault.
    pub fn with_cause(mut self, cause: FaultCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Message key.
    pub fn key(&self) -> MessageKey {
        self.key
    }

    /// Parameters used to render the message.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Severity.
    pub fn severity(&self) -> MessageSeverity {
        self.severity
    }

    /// Status.
    pub fn status(&self) -> FaultStatus {
        self.status
    }

    /// Underlying cause, if any.
    pub fn cause(&self) -> Option<&FaultCause> {
        self.cause.as_ref()
    }
}

impl fmt::Debug for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeFault")
            .field("key", &self.key.key())
            .field("message", &self.message)
            .field("severity", &self.severity)
            .field("status", &self.status.code())
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

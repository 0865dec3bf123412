//! Message severities and consumer-facing message keys.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Severity of a message, audit record or fault.
///
/// FATAL maps to the 500 series of HTTP statuses, ERROR to the 400 series,
/// WARN to the 200 series; INFO, DEBUG and TRACE are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MessageSeverity {
    /// Normal operation.
    #[default]
    Info,
    /// Something worth a look, the operation still succeeded.
    Warn,
    /// The operation failed because of its input.
    Error,
    /// The operation failed because of the system.
    Fatal,
    /// Developer detail.
    Debug,
    /// Fine-grained developer detail.
    Trace,
}

impl MessageSeverity {
    /// All severities.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }

    /// ERROR and FATAL carry a cause into the audit trail.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Fatal)
    }
}

/// Consumer-facing message keys.
///
/// Each key has a stable identifier and a message template whose `{0}`,
/// `{1}`... placeholders are filled from positional parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKey {
    /// No specific key applies.
    NoKey,
    /// An interceptor or aspect failed while auditing.
    InterceptorException,
    /// Writing an audit record failed.
    AuditWriteFailed,
    /// An unexpected error bubbled out of infrastructure code.
    UnexpectedError,
}

impl MessageKey {
    /// Stable key identifier.
    pub fn key(&self) -> &'static str {
        match self {
            Self::NoKey => "NO_KEY",
            Self::InterceptorException => "bulwark.audit.interceptor.exception",
            Self::AuditWriteFailed => "bulwark.audit.write.failed",
            Self::UnexpectedError => "bulwark.unexpected.error",
        }
    }

    /// Message template.
    pub fn template(&self) -> &'static str {
        match self {
            Self::NoKey => "No key was provided",
            Self::InterceptorException => "{0} - Exception occurred while attempting to {1}.",
            Self::AuditWriteFailed => "{0} - Unable to write the audit record for {1}.",
            Self::UnexpectedError => "Unexpected error: {0}",
        }
    }

    /// Render the template with positional parameters.
    ///
    /// Placeholders without a matching parameter are left as-is.
    pub fn message<S: AsRef<str>>(&self, params: &[S]) -> String {
        let mut message = self.template().to_string();
        for (i, param) in params.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), param.as_ref());
        }
        message
    }
}

//! Error attached to failure records.

use bulwark_common_core::{FaultCause, RuntimeFault};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Shared handle to the error behind an audited failure.
///
/// `Display` renders the whole source chain, `outer: inner: root`.
#[derive(Clone)]
pub struct AuditCause(FaultCause);

impl AuditCause {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    pub fn from_arc(error: FaultCause) -> Self {
        Self(error)
    }

    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    pub fn into_inner(self) -> FaultCause {
        self.0
    }

    /// Messages of the error and each of its sources, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.0.to_string()];
        let mut source = self.0.source();
        while let Some(err) = source {
            messages.push(err.to_string());
            source = err.source();
        }
        messages
    }
}

impl fmt::Display for AuditCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chain().join(": "))
    }
}

impl fmt::Debug for AuditCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuditCause").field(&self.0).finish()
    }
}

impl From<RuntimeFault> for AuditCause {
    fn from(fault: RuntimeFault) -> Self {
        Self::new(fault)
    }
}

impl From<std::io::Error> for AuditCause {
    fn from(error: std::io::Error) -> Self {
        Self::new(error)
    }
}

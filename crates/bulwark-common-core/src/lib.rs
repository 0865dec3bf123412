//! Bulwark common core types.
//!
//! Severities and message keys shared by every Bulwark crate, plus the
//! standardized [`RuntimeFault`] raised when infrastructure code fails.

pub mod fault;
pub mod messages;

pub use fault::{FaultCause, FaultStatus, RuntimeFault};
pub use messages::{MessageKey, MessageSeverity};

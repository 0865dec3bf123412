//! Audit event types for Bulwark.
//!
//! An audit record pairs an [`AuditEvent`] (what happened) with
//! [`AuditableData`] (the object graph to render). Object graphs are
//! expressed in the [`AuditValue`] model; types that need their own field
//! layout implement [`AuditObject`].

mod cause;
mod channel;
mod data;
mod event;
mod events;
mod id;
mod object;
mod value;

pub use cause::AuditCause;
pub use channel::AuditChannel;
pub use data::{AuditableData, RequestAuditData, ResponseAuditData};
pub use event::AuditEvent;
pub use events::AuditEvents;
pub use id::AuditEventId;
pub use object::{AuditObject, ObjectError, SerdeObject};
pub use value::{AuditField, AuditValue, FieldPredicate, StructValue};

pub use bulwark_common_core::MessageSeverity;

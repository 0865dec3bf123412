//! Core audit event type.

use crate::{AuditEventId, AuditEvents};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable descriptor of what is being audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    id: AuditEventId,
    occurred_at: DateTime<Utc>,
    event: AuditEvents,
    activity: String,
    audited: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl AuditEvent {
    /// Create an event for `activity` performed by `audited`.
    ///
    /// `audited` names the type or operation under audit.
    pub fn new(event: AuditEvents, activity: impl Into<String>, audited: impl Into<String>) -> Self {
        Self {
            id: AuditEventId::new(),
            occurred_at: Utc::now(),
            event,
            activity: activity.into(),
            audited: audited.into(),
            correlation_id: None,
        }
    }

    /// Tie this event to others sharing `id`, such as the request and
    /// response of one exchange. Events with the same id are written in
    /// submission order whichever thread submits them.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn id(&self) -> AuditEventId {
        self.id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn event(&self) -> AuditEvents {
        self.event
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn audited(&self) -> &str {
        &self.audited
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent{{event={}, activity={}, audited={}}}",
            self.event, self.activity, self.audited
        )
    }
}

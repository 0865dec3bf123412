//! Caller-defined auditable objects.

use crate::value::{AuditField, AuditValue};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure to expose an object's fields.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ObjectError {
    message: String,
}

impl ObjectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An object that knows how to present itself to the audit trail.
///
/// Renderers try three views in order: the structured field list, the
/// object's own text, and finally the key/value description. Only the last
/// one is required to succeed.
pub trait AuditObject: Send + Sync {
    /// Name shown for this object in text renderings.
    fn type_name(&self) -> &str;

    /// Fields for structured rendering, in output order.
    fn audit_fields(&self) -> Result<Vec<AuditField>, ObjectError>;

    /// Custom text representation, if the type has one.
    fn write_text(&self, out: &mut dyn fmt::Write) -> Option<fmt::Result> {
        let _ = out;
        None
    }

    /// Flat key/value description of the object's state.
    fn describe(&self) -> Vec<(String, String)>;
}

/// Adapter for third-party types that only implement [`Serialize`].
///
/// Fields come from the value's JSON form: a JSON object contributes one
/// field per key, anything else a single `value` field.
pub struct SerdeObject<T> {
    type_name: String,
    value: T,
}

impl<T: Serialize + Send + Sync> SerdeObject<T> {
    pub fn new(value: T) -> Self {
        Self {
            type_name: short_type_name(std::any::type_name::<T>()).to_string(),
            value,
        }
    }

    /// Override the name shown in text renderings.
    pub fn named(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn get_ref(&self) -> &T {
        &self.value
    }

    fn to_json(&self) -> Result<serde_json::Value, ObjectError> {
        serde_json::to_value(&self.value).map_err(|e| ObjectError::new(e.to_string()))
    }
}

impl<T: Serialize + Send + Sync> AuditObject for SerdeObject<T> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn audit_fields(&self) -> Result<Vec<AuditField>, ObjectError> {
        Ok(match self.to_json()? {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(name, value)| AuditField::new(name, AuditValue::from(value)))
                .collect(),
            other => vec![AuditField::new("value", AuditValue::from(other))],
        })
    }

    fn describe(&self) -> Vec<(String, String)> {
        match self.to_json() {
            Ok(serde_json::Value::Object(map)) => map
                .into_iter()
                .map(|(name, value)| (name, json_text(value)))
                .collect(),
            Ok(other) => vec![("value".to_string(), json_text(other))],
            Err(e) => vec![("error".to_string(), e.to_string())],
        }
    }
}

fn json_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// `alloc::vec::Vec<my_crate::Thing>` becomes `Vec<my_crate::Thing>`.
fn short_type_name(full: &str) -> &str {
    let base_end = full.find('<').unwrap_or(full.len());
    let start = full[..base_end].rfind("::").map(|i| i + 2).unwrap_or(0);
    &full[start..]
}

//! The audit value model.
//!
//! Everything that reaches the audit trail is first expressed as an
//! [`AuditValue`] tree. Renderers never see domain types directly: they walk
//! this tree, and only call back into [`AuditObject`] for opaque objects.

use crate::object::AuditObject;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A node in an auditable object graph.
#[derive(Clone)]
pub enum AuditValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Binary payload; subject to the payload limit inside request and
    /// response containers.
    Bytes(Bytes),
    Timestamp(DateTime<FixedOffset>),
    List(Vec<AuditValue>),
    Map(BTreeMap<String, AuditValue>),
    /// Named record with ordered fields.
    Struct(StructValue),
    /// Caller-defined object, rendered through its [`AuditObject`] impl.
    Object(Arc<dyn AuditObject>),
}

/// Named record with fields in declaration order.
#[derive(Debug, Clone)]
pub struct StructValue {
    pub type_name: String,
    pub fields: Vec<AuditField>,
}

/// One field of a [`StructValue`] or [`AuditObject`].
#[derive(Debug, Clone)]
pub struct AuditField {
    pub name: String,
    pub value: AuditValue,
}

impl AuditField {
    pub fn new(name: impl Into<String>, value: impl Into<AuditValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl StructValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<AuditValue>) -> Self {
        self.fields.push(AuditField::new(name, value));
        self
    }

    /// Look up a field by exact name.
    pub fn get(&self, name: &str) -> Option<&AuditValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

impl AuditValue {
    /// Wrap a caller-defined object.
    pub fn object<T: AuditObject + 'static>(object: T) -> Self {
        Self::Object(Arc::new(object))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Binary payload, if this value is one.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Plain-text rendering that never consults custom text hooks.
    ///
    /// Objects are shown through [`AuditObject::describe`], so this cannot
    /// fail and cannot recurse into an object graph.
    pub fn describe_text(&self) -> String {
        self.describe_text_with(&include_all)
    }

    /// [`describe_text`](Self::describe_text) leaving out every struct
    /// field, map key and described object field `include` rejects.
    pub fn describe_text_with(&self, include: FieldPredicate<'_>) -> String {
        TextView {
            value: self,
            custom_text: false,
            include,
        }
        .to_string()
    }

    /// Same rendering as `Display`, leaving out every struct field, map key
    /// and described object field `include` rejects.
    ///
    /// An object's own custom text is opaque and written as the object
    /// produces it.
    pub fn text_with<'a>(&'a self, include: FieldPredicate<'a>) -> impl fmt::Display + 'a {
        TextView {
            value: self,
            custom_text: true,
            include,
        }
    }
}

/// Decides whether a field name may appear in a text rendering.
pub type FieldPredicate<'a> = &'a dyn Fn(&str) -> bool;

fn include_all(_: &str) -> bool {
    true
}

/// `toString`-style rendering: `Type{field=value, ...}`, `[a, b]`, `{k=v}`.
///
/// Objects use their own [`AuditObject::write_text`] when they provide one;
/// an error from that hook is returned as-is.
impl fmt::Display for AuditValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.text_with(&include_all), f)
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        TextView {
            value: &AuditValue::Null,
            custom_text: true,
            include: &include_all,
        }
        .write_struct(f, self)
    }
}

struct TextView<'a> {
    value: &'a AuditValue,
    custom_text: bool,
    include: FieldPredicate<'a>,
}

impl<'a> TextView<'a> {
    fn nested<'b>(&'b self, value: &'b AuditValue) -> TextView<'b> {
        TextView {
            value,
            custom_text: self.custom_text,
            include: self.include,
        }
    }

    fn write_struct(&self, f: &mut fmt::Formatter<'_>, s: &StructValue) -> fmt::Result {
        write!(f, "{}{{", s.type_name)?;
        let fields = s.fields.iter().filter(|field| (self.include)(field.name.as_str()));
        for (i, field) in fields.enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", field.name, self.nested(&field.value))?;
        }
        f.write_str("}")
    }

    fn write_described(&self, f: &mut fmt::Formatter<'_>, object: &dyn AuditObject) -> fmt::Result {
        write!(f, "{}{{", object.type_name())?;
        let described = object.describe();
        let entries = described.iter().filter(|(name, _)| (self.include)(name.as_str()));
        for (i, (name, value)) in entries.enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for TextView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            AuditValue::Null => f.write_str("null"),
            AuditValue::Bool(b) => write!(f, "{}", b),
            AuditValue::Integer(i) => write!(f, "{}", i),
            AuditValue::Float(x) => write!(f, "{}", x),
            AuditValue::Text(s) => f.write_str(s),
            AuditValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            AuditValue::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
            AuditValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.nested(item))?;
                }
                f.write_str("]")
            }
            AuditValue::Map(map) => {
                f.write_str("{")?;
                let entries = map.iter().filter(|(key, _)| (self.include)(key.as_str()));
                for (i, (key, value)) in entries.enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", key, self.nested(value))?;
                }
                f.write_str("}")
            }
            AuditValue::Struct(s) => self.write_struct(f, s),
            AuditValue::Object(object) => {
                if self.custom_text {
                    if let Some(result) = object.write_text(f) {
                        return result;
                    }
                }
                self.write_described(f, object.as_ref())
            }
        }
    }
}

impl fmt::Debug for AuditValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Bytes(b) => write!(f, "Bytes(<{} bytes>)", b.len()),
            Self::Timestamp(ts) => f.debug_tuple("Timestamp").field(ts).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Struct(s) => f.debug_tuple("Struct").field(s).finish(),
            Self::Object(o) => write!(f, "Object({})", o.type_name()),
        }
    }
}

impl From<bool> for AuditValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for AuditValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for AuditValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for AuditValue {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for AuditValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for AuditValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AuditValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Bytes> for AuditValue {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<DateTime<FixedOffset>> for AuditValue {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<DateTime<Utc>> for AuditValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts.fixed_offset())
    }
}

impl From<StructValue> for AuditValue {
    fn from(s: StructValue) -> Self {
        Self::Struct(s)
    }
}

impl From<Arc<dyn AuditObject>> for AuditValue {
    fn from(o: Arc<dyn AuditObject>) -> Self {
        Self::Object(o)
    }
}

impl<T: Into<AuditValue>> From<Option<T>> for AuditValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<AuditValue>> From<Vec<T>> for AuditValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<AuditValue>> From<BTreeMap<String, V>> for AuditValue {
    fn from(map: BTreeMap<String, V>) -> Self {
        Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<serde_json::Value> for AuditValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

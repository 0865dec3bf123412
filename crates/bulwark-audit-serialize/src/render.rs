//! The three rendering tiers.

use crate::error::RenderError;
use crate::filter::FieldFilter;
use crate::limiter::PayloadLimiter;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bulwark_audit_types::{AuditField, AuditValue, AuditableData};
use bulwark_common_config::{validate_date_format, AuditConfig, DEFAULT_DATE_FORMAT};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::sync::Arc;

const DEFAULT_MAX_DEPTH: usize = 64;

/// Renderer settings, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    filter: FieldFilter,
    limiter: PayloadLimiter,
    date_format: String,
    max_depth: usize,
}

impl RenderConfig {
    pub fn new(
        filter: FieldFilter,
        limiter: PayloadLimiter,
        date_format: impl Into<String>,
    ) -> Result<Self, RenderError> {
        let date_format = date_format.into();
        validate_date_format(&date_format).map_err(|_| RenderError::DateFormat {
            format: date_format.clone(),
        })?;
        Ok(Self {
            filter,
            limiter,
            date_format,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn from_audit_config(config: &AuditConfig) -> Result<Self, RenderError> {
        let limiter = PayloadLimiter::new(config.payload_limit_bytes).with_policy(config.under_limit_policy);
        Ok(Self::new(FieldFilter::new(&config.excluded_fields), limiter, &config.date_format)?
            .with_max_depth(config.max_depth))
    }

    /// Values nested deeper than this render as `null`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn filter(&self) -> &FieldFilter {
        &self.filter
    }

    pub fn limiter(&self) -> &PayloadLimiter {
        &self.limiter
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            filter: FieldFilter::default(),
            limiter: PayloadLimiter::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Tier 1: JSON rendering with field filtering.
///
/// Binary payloads become base64 strings and timestamps use the configured
/// format. An object reached again while it is still being rendered is
/// written as `null`, as is anything nested past the depth limit.
pub fn render_structured(config: &RenderConfig, value: &AuditValue) -> Result<String, RenderError> {
    let walk = Walk {
        config,
        visiting: RefCell::new(Vec::new()),
    };
    let root = Node {
        walk: &walk,
        value,
        depth: 0,
    };
    Ok(serde_json::to_string(&root)?)
}

/// Tier 2: the data's own text representation.
///
/// Excluded names are left out of built-in containers at any depth.
pub fn render_custom_text(config: &RenderConfig, data: &AuditableData) -> Result<String, RenderError> {
    let include = |name: &str| config.filter.should_include(name);
    let mut text = String::new();
    match data.write_text(&mut text, &include) {
        Some(Ok(())) if !text.is_empty() => Ok(text),
        Some(Ok(())) | None => Err(RenderError::NoCustomText {
            type_name: data.type_name().to_string(),
        }),
        Some(Err(_)) => Err(RenderError::CustomText {
            type_name: data.type_name().to_string(),
        }),
    }
}

/// Tier 3: flat JSON-style dump of the data's description. Cannot fail.
///
/// Excluded names are still dropped, nested ones included; nothing else is
/// interpreted.
pub fn render_field_dump(config: &RenderConfig, data: &AuditableData) -> String {
    let include = |name: &str| config.filter.should_include(name);
    let mut out = String::from("{");
    for (i, (name, value)) in data.describe(&include).into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&serde_json::Value::String(name).to_string());
        out.push(':');
        out.push_str(&serde_json::Value::String(value).to_string());
    }
    out.push('}');
    out
}

/// Per-call traversal state.
struct Walk<'a> {
    config: &'a RenderConfig,
    /// Objects on the current path, by address.
    visiting: RefCell<Vec<usize>>,
}

struct Node<'a> {
    walk: &'a Walk<'a>,
    value: &'a AuditValue,
    depth: usize,
}

impl<'a> Node<'a> {
    fn child(&self, value: &'a AuditValue) -> Node<'a> {
        Node {
            walk: self.walk,
            value,
            depth: self.depth + 1,
        }
    }

    fn serialize_fields<S: Serializer>(&self, fields: &[AuditField], serializer: S) -> Result<S::Ok, S::Error> {
        let filter = &self.walk.config.filter;
        let included: Vec<&AuditField> = fields.iter().filter(|f| filter.should_include(&f.name)).collect();
        let mut map = serializer.serialize_map(Some(included.len()))?;
        for field in included {
            let value = Node {
                walk: self.walk,
                value: &field.value,
                depth: self.depth + 1,
            };
            map.serialize_entry(&field.name, &value)?;
        }
        map.end()
    }
}

impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.depth > self.walk.config.max_depth {
            return serializer.serialize_unit();
        }

        match self.value {
            AuditValue::Null => serializer.serialize_unit(),
            AuditValue::Bool(b) => serializer.serialize_bool(*b),
            AuditValue::Integer(i) => serializer.serialize_i64(*i),
            AuditValue::Float(x) => serializer.serialize_f64(*x),
            AuditValue::Text(s) => serializer.serialize_str(s),
            AuditValue::Bytes(b) => serializer.serialize_str(&STANDARD.encode(b)),
            AuditValue::Timestamp(ts) => serializer.collect_str(&ts.format(&self.walk.config.date_format)),
            AuditValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            AuditValue::Map(entries) => {
                let filter = &self.walk.config.filter;
                let included: Vec<_> = entries.iter().filter(|(k, _)| filter.should_include(k)).collect();
                let mut map = serializer.serialize_map(Some(included.len()))?;
                for (key, value) in included {
                    map.serialize_entry(key, &self.child(value))?;
                }
                map.end()
            }
            AuditValue::Struct(s) => self.serialize_fields(&s.fields, serializer),
            AuditValue::Object(object) => {
                let address = Arc::as_ptr(object) as *const () as usize;
                if self.walk.visiting.borrow().contains(&address) {
                    return serializer.serialize_unit();
                }

                let fields = object
                    .audit_fields()
                    .map_err(|e| S::Error::custom(format_args!("{}: {}", object.type_name(), e)))?;

                self.walk.visiting.borrow_mut().push(address);
                let result = self.serialize_fields(&fields, serializer);
                self.walk.visiting.borrow_mut().pop();
                result
            }
        }
    }
}

//! Tiered audit serializer.

use crate::error::RenderError;
use crate::render::{render_custom_text, render_field_dump, render_structured, RenderConfig};
use bulwark_audit_types::AuditableData;
use bulwark_common_config::AuditConfig;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Rendering strategy that produced a record's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Filtered JSON.
    Structured,
    /// The data's own text representation.
    CustomText,
    /// Flat key/value dump.
    FieldDump,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structured => "structured",
            Self::CustomText => "custom_text",
            Self::FieldDump => "field_dump",
        })
    }
}

/// A tier that failed on the way to the final text.
#[derive(Debug)]
pub struct TierFailure {
    pub tier: Tier,
    pub type_name: String,
    pub error: RenderError,
}

impl TierFailure {
    /// Diagnostic line naming the failed tier and the one tried next.
    pub fn message(&self) -> String {
        match self.tier {
            Tier::Structured => format!(
                "Error occurred on JSON rendering of {}, falling back to custom text",
                self.type_name
            ),
            Tier::CustomText | Tier::FieldDump => format!(
                "Error occurred on custom text rendering of {}, falling back to field dump",
                self.type_name
            ),
        }
    }
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message(), self.error)
    }
}

/// Result of serializing one piece of auditable data.
#[derive(Debug)]
pub struct Serialized {
    pub text: String,
    pub tier: Tier,
    /// Failures of earlier tiers, in the order they happened.
    pub failures: Vec<TierFailure>,
}

impl Serialized {
    pub fn is_fallback(&self) -> bool {
        self.tier != Tier::Structured
    }
}

/// Turns auditable data into text, never failing.
///
/// The serializer itself does not report tier failures beyond debug logs;
/// they are returned in [`Serialized::failures`] for the caller to route.
#[derive(Debug, Clone)]
pub struct AuditSerializer {
    config: Arc<RenderConfig>,
}

impl AuditSerializer {
    /// Serializer sharing an already built render configuration.
    pub fn new(config: Arc<RenderConfig>) -> Self {
        Self { config }
    }

    /// Build the render configuration from the `audit` config section.
    pub fn from_audit_config(config: &AuditConfig) -> Result<Self, RenderError> {
        Ok(Self::new(Arc::new(RenderConfig::from_audit_config(config)?)))
    }

    /// Settings every tier renders with.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Limit payloads, then render with the first tier that succeeds.
    ///
    /// Every tier leaves out excluded fields. The last tier cannot fail, so
    /// there is always text to write.
    pub fn serialize(&self, data: AuditableData) -> Serialized {
        let data = data.limit_payloads(|parts| self.config.limiter().limit(parts));
        let type_name = data.type_name().to_string();
        let mut failures = Vec::new();

        match render_structured(&self.config, &data.to_value()) {
            Ok(text) => {
                return Serialized {
                    text,
                    tier: Tier::Structured,
                    failures,
                }
            }
            Err(error) => {
                debug!(type_name = %type_name, error = %error, "Structured audit rendering failed");
                failures.push(TierFailure {
                    tier: Tier::Structured,
                    type_name: type_name.clone(),
                    error,
                });
            }
        }

        match render_custom_text(&self.config, &data) {
            Ok(text) => {
                return Serialized {
                    text,
                    tier: Tier::CustomText,
                    failures,
                }
            }
            Err(error) => {
                debug!(type_name = %type_name, error = %error, "Custom text audit rendering failed");
                failures.push(TierFailure {
                    tier: Tier::CustomText,
                    type_name,
                    error,
                });
            }
        }

        Serialized {
            text: render_field_dump(&self.config, &data),
            tier: Tier::FieldDump,
            failures,
        }
    }
}

impl Default for AuditSerializer {
    fn default() -> Self {
        Self::new(Arc::new(RenderConfig::default()))
    }
}

//! Rendering of auditable data into bounded, filtered audit text.
//!
//! Rendering runs in two phases. A pure [`PayloadLimiter`] pass caps binary
//! payloads in request and response containers, then the renderer walks the
//! value tree consulting the [`FieldFilter`] per field. When structured
//! rendering fails, [`AuditSerializer`] falls back to the data's own text
//! and finally to a flat field dump, so some text is always produced.

mod error;
mod filter;
mod limiter;
mod render;
mod serializer;

pub use error::RenderError;
pub use filter::FieldFilter;
pub use limiter::{PayloadLimiter, PayloadSizer, StreamSizer};
pub use render::{render_custom_text, render_field_dump, render_structured, RenderConfig};
pub use serializer::{AuditSerializer, Serialized, Tier, TierFailure};

pub use bulwark_common_config::UnderLimitPolicy;

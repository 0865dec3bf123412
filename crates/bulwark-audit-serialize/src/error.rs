//! Rendering errors.

use thiserror::Error;

/// Why a rendering tier failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("structured rendering failed: {0}")]
    Structured(#[from] serde_json::Error),

    #[error("custom text rendering of {type_name} failed")]
    CustomText { type_name: String },

    #[error("{type_name} has no custom text representation")]
    NoCustomText { type_name: String },

    #[error("invalid date format '{format}'")]
    DateFormat { format: String },
}

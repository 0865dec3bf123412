//! Auditable data containers.

use crate::object::AuditObject;
use crate::value::{AuditValue, FieldPredicate, StructValue};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What an inbound or outbound request looked like.
#[derive(Debug, Clone, Default)]
pub struct RequestAuditData {
    /// Request parts in argument order. Binary parts are size limited.
    pub request: Vec<AuditValue>,
    /// HTTP method, when the request came over HTTP.
    pub method: Option<String>,
    pub uri: Option<String>,
    /// Request headers by name.
    pub headers: BTreeMap<String, String>,
    /// Text previews of attachments, see `read_bounded_preview`.
    pub attachment_text_list: Vec<String>,
}

impl RequestAuditData {
    /// Empty request with no parts or headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request part.
    pub fn with_part(mut self, part: impl Into<AuditValue>) -> Self {
        self.request.push(part.into());
        self
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the request URI.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Add a header; a repeated name replaces the earlier value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Append an attachment preview.
    pub fn with_attachment_text(mut self, text: impl Into<String>) -> Self {
        self.attachment_text_list.push(text.into());
        self
    }

    /// Structured view; absent method/uri and an empty attachment list are
    /// left out.
    pub fn to_value(&self) -> AuditValue {
        let mut value = StructValue::new("RequestAuditData").field("request", self.request.clone());
        if let Some(method) = &self.method {
            value = value.field("method", method.as_str());
        }
        if let Some(uri) = &self.uri {
            value = value.field("uri", uri.as_str());
        }
        value = value.field("headers", self.headers.clone());
        if !self.attachment_text_list.is_empty() {
            value = value.field("attachmentTextList", self.attachment_text_list.clone());
        }
        value.into()
    }
}

/// What a response looked like.
#[derive(Debug, Clone, Default)]
pub struct ResponseAuditData {
    /// The response object, `None` until one is attached.
    pub response: Option<AuditValue>,
}

impl ResponseAuditData {
    /// Container without a response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_response`](Self::set_response).
    pub fn with_response(mut self, response: impl Into<AuditValue>) -> Self {
        self.set_response(response);
        self
    }

    /// Attach the response object.
    pub fn set_response(&mut self, response: impl Into<AuditValue>) {
        self.response = Some(response.into());
    }

    /// Structured view; a missing response renders as null.
    pub fn to_value(&self) -> AuditValue {
        StructValue::new("ResponseAuditData")
            .field("response", self.response.clone())
            .into()
    }
}

/// The object graph of one audit record.
///
/// Submitting data moves it into the dispatcher; callers cannot touch it
/// while it is being rendered.
#[derive(Clone)]
pub enum AuditableData {
    /// Request container; its parts are size limited.
    Request(RequestAuditData),
    /// Response container; its response object is size limited.
    Response(ResponseAuditData),
    /// Caller-defined object, rendered through [`AuditObject`].
    Custom(Arc<dyn AuditObject>),
}

impl AuditableData {
    /// Wrap a caller-defined object.
    pub fn custom<T: AuditObject + 'static>(object: T) -> Self {
        Self::Custom(Arc::new(object))
    }

    /// Name of the container or custom type, used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Request(_) => "RequestAuditData",
            Self::Response(_) => "ResponseAuditData",
            Self::Custom(object) => object.type_name(),
        }
    }

    /// Structured view used by the primary renderer.
    pub fn to_value(&self) -> AuditValue {
        match self {
            Self::Request(request) => request.to_value(),
            Self::Response(response) => response.to_value(),
            Self::Custom(object) => AuditValue::Object(Arc::clone(object)),
        }
    }

    /// Run `limit` over the top-level request parts or the response object.
    ///
    /// Custom objects are opaque and returned unchanged.
    pub fn limit_payloads<F>(self, limit: F) -> Self
    where
        F: FnOnce(Vec<AuditValue>) -> Vec<AuditValue>,
    {
        match self {
            Self::Request(mut request) => {
                request.request = limit(std::mem::take(&mut request.request));
                Self::Request(request)
            }
            Self::Response(mut response) => {
                let parts = response.response.take().into_iter().collect();
                response.response = limit(parts).into_iter().next();
                Self::Response(response)
            }
            custom @ Self::Custom(_) => custom,
        }
    }

    /// The container's own text representation, if it has one.
    ///
    /// Built-in containers leave out every field `include` rejects, at any
    /// depth. A custom object's text is its own and is written unchanged.
    pub fn write_text(&self, out: &mut dyn fmt::Write, include: FieldPredicate<'_>) -> Option<fmt::Result> {
        match self {
            Self::Request(_) | Self::Response(_) => Some(write!(out, "{}", self.to_value().text_with(include))),
            Self::Custom(object) => object.write_text(out),
        }
    }

    /// Flat key/value description without the names `include` rejects;
    /// never fails.
    pub fn describe(&self, include: FieldPredicate<'_>) -> Vec<(String, String)> {
        let entries = match self {
            Self::Custom(object) => object.describe(),
            other => match other.to_value() {
                AuditValue::Struct(s) => s
                    .fields
                    .into_iter()
                    .map(|f| (f.name, f.value.describe_text_with(include)))
                    .collect(),
                value => vec![("value".to_string(), value.describe_text_with(include))],
            },
        };
        entries.into_iter().filter(|(name, _)| include(name.as_str())).collect()
    }
}

impl fmt::Display for RequestAuditData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Display for ResponseAuditData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Debug for AuditableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(request) => f.debug_tuple("Request").field(request).finish(),
            Self::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Self::Custom(object) => write!(f, "Custom({})", object.type_name()),
        }
    }
}

impl From<RequestAuditData> for AuditableData {
    fn from(request: RequestAuditData) -> Self {
        Self::Request(request)
    }
}

impl From<ResponseAuditData> for AuditableData {
    fn from(response: ResponseAuditData) -> Self {
        Self::Response(response)
    }
}

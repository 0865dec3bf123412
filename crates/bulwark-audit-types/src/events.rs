//! Audit event categories.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Category of an audited occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvents {
    /// Inbound REST request.
    ApiRestRequest,
    /// Outbound REST response.
    ApiRestResponse,
    /// Request and response audited together.
    RequestResponse,
    /// Service-level message or internal failure.
    ServiceAudit,
    /// Response served from cache.
    CachedServiceResponse,
    /// Request sent to a partner REST service.
    PartnerRestRequest,
    /// Response received from a partner REST service.
    PartnerRestResponse,
    /// Request sent to a partner SOAP service.
    PartnerSoapRequest,
    /// Response received from a partner SOAP service.
    PartnerSoapResponse,
    /// Fault received from a partner SOAP service.
    PartnerSoapFault,
}

impl AuditEvents {
    /// Get all categories.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }

    /// Events that describe traffic with a partner system.
    pub fn is_partner(&self) -> bool {
        matches!(
            self,
            Self::PartnerRestRequest
                | Self::PartnerRestResponse
                | Self::PartnerSoapRequest
                | Self::PartnerSoapResponse
                | Self::PartnerSoapFault
        )
    }
}

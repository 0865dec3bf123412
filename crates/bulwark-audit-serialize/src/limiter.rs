//! Size limiting of binary payloads.

use bulwark_audit_types::AuditValue;
use bulwark_common_config::{UnderLimitPolicy, DEFAULT_PAYLOAD_LIMIT_BYTES};
use bytes::Bytes;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::{debug, error};

/// Measures the serialized size of a binary payload.
pub trait PayloadSizer: Send + Sync {
    fn measure(&self, payload: &[u8]) -> io::Result<u64>;
}

/// Counts bytes by streaming the payload into a sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamSizer;

impl PayloadSizer for StreamSizer {
    fn measure(&self, mut payload: &[u8]) -> io::Result<u64> {
        io::copy(&mut payload, &mut io::sink())
    }
}

/// Caps binary payloads at a byte limit.
///
/// Over-limit payloads are replaced by a zero-filled placeholder of exactly
/// `limit` bytes. Payloads at or under the limit follow the
/// [`UnderLimitPolicy`]. Every other value passes through untouched.
#[derive(Clone)]
pub struct PayloadLimiter {
    limit: usize,
    policy: UnderLimitPolicy,
    sizer: Arc<dyn PayloadSizer>,
}

impl PayloadLimiter {
    /// Limiter with the default policy that measures by streaming.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            policy: UnderLimitPolicy::default(),
            sizer: Arc::new(StreamSizer),
        }
    }

    /// What to do with payloads at or under the limit.
    pub fn with_policy(mut self, policy: UnderLimitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the way payload sizes are measured.
    pub fn with_sizer(mut self, sizer: Arc<dyn PayloadSizer>) -> Self {
        self.sizer = sizer;
        self
    }

    /// Largest payload kept as-is, in bytes.
    pub fn limit_bytes(&self) -> usize {
        self.limit
    }

    /// Current under-limit policy.
    pub fn policy(&self) -> UnderLimitPolicy {
        self.policy
    }

    /// Apply the limit to each value.
    ///
    /// All payloads are measured before anything is replaced; if any
    /// measurement fails the input is returned as it came in.
    pub fn limit(&self, values: Vec<AuditValue>) -> Vec<AuditValue> {
        let measured: io::Result<Vec<Option<u64>>> = values
            .iter()
            .map(|value| value.as_bytes().map(|b| self.sizer.measure(b)).transpose())
            .collect();

        let sizes = match measured {
            Ok(sizes) => sizes,
            Err(e) => {
                error!(error = %e, limit = self.limit, "Failed to measure audit payload, keeping payloads as they are");
                return values;
            }
        };

        values
            .into_iter()
            .zip(sizes)
            .filter_map(|(value, size)| match size {
                Some(size) if size > self.limit as u64 => {
                    debug!(size, limit = self.limit, "Replacing oversized audit payload");
                    Some(AuditValue::Bytes(Bytes::from(vec![0u8; self.limit])))
                }
                Some(_) => match self.policy {
                    UnderLimitPolicy::PassThrough => Some(value),
                    UnderLimitPolicy::Drop => None,
                },
                None => Some(value),
            })
            .collect()
    }
}

impl Default for PayloadLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_LIMIT_BYTES)
    }
}

impl fmt::Debug for PayloadLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadLimiter")
            .field("limit", &self.limit)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSizer;

    impl PayloadSizer for FailingSizer {
        fn measure(&self, _payload: &[u8]) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Other, "stream closed"))
        }
    }

    fn payload(len: usize) -> AuditValue {
        AuditValue::Bytes(Bytes::from(vec![7u8; len]))
    }

    fn lens(values: &[AuditValue]) -> Vec<Option<usize>> {
        values.iter().map(|v| v.as_bytes().map(Bytes::len)).collect()
    }

    #[test]
    fn test_stream_sizer_counts_bytes() {
        assert_eq!(StreamSizer.measure(&[1, 2, 3]).unwrap(), 3);
        assert_eq!(StreamSizer.measure(&[]).unwrap(), 0);
    }

    #[test]
    fn test_oversized_payload_becomes_zeroed_placeholder() {
        let limited = PayloadLimiter::new(1024).limit(vec![payload(2048)]);
        assert_eq!(limited.len(), 1);
        let bytes = limited[0].as_bytes().unwrap();
        assert_eq!(bytes.len(), 1024);
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_pass_through_keeps_small_payloads_and_other_values() {
        let values = vec![payload(1024), AuditValue::from("text"), payload(10), payload(1025)];
        let limited = PayloadLimiter::new(1024).limit(values);
        assert_eq!(lens(&limited), vec![Some(1024), None, Some(10), Some(1024)]);
        assert_eq!(limited[0].as_bytes().unwrap()[0], 7);
        assert_eq!(limited[1].as_str(), Some("text"));
    }

    #[test]
    fn test_drop_policy_removes_small_payloads() {
        let values = vec![payload(1024), AuditValue::from("text"), payload(10), payload(1025)];
        let limited = PayloadLimiter::new(1024)
            .with_policy(UnderLimitPolicy::Drop)
            .limit(values);
        assert_eq!(lens(&limited), vec![None, Some(1024)]);
    }

    #[test]
    fn test_measurement_failure_returns_original_values() {
        let values = vec![payload(4096), AuditValue::from("text")];
        let limited = PayloadLimiter::new(16)
            .with_sizer(Arc::new(FailingSizer))
            .limit(values);
        assert_eq!(lens(&limited), vec![Some(4096), None]);
    }

    #[test]
    fn test_no_payloads_skips_sizer() {
        let limited = PayloadLimiter::new(16)
            .with_sizer(Arc::new(FailingSizer))
            .limit(vec![AuditValue::from(1), AuditValue::Null]);
        assert_eq!(limited.len(), 2);
    }
}

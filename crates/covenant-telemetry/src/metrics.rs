//! Validation metrics.
//!
//! Metrics are recorded through the `metrics` facade. Without an installed
//! recorder every call is a no-op, so services choose their own exporter.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `covenant_validations_total` | Counter | `phase`, `operation` | Validated exchanges |
//! | `covenant_validation_failures_total` | Counter | `phase`, `operation`, `code` | Rejected exchanges |
//! | `covenant_unmatched_requests_total` | Counter | - | Requests outside the contract |
//! | `covenant_response_body_bytes` | Histogram | `operation` | Drained response sizes |

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Validated exchanges.
pub const VALIDATIONS_TOTAL: &str = "covenant_validations_total";
/// Rejected exchanges.
pub const VALIDATION_FAILURES_TOTAL: &str = "covenant_validation_failures_total";
/// Requests that matched no operation.
pub const UNMATCHED_REQUESTS_TOTAL: &str = "covenant_unmatched_requests_total";
/// Drained response sizes.
pub const RESPONSE_BODY_BYTES: &str = "covenant_response_body_bytes";

/// Which half of an exchange was validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Request validation.
    Request,
    /// Response validation.
    Response,
}

impl Phase {
    /// Label value for this phase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

/// Registers descriptions for all metrics. Call once after installing a
/// recorder.
pub fn describe_metrics() {
    describe_counter!(VALIDATIONS_TOTAL, "Exchanges validated against the contract");
    describe_counter!(
        VALIDATION_FAILURES_TOTAL,
        "Exchanges rejected by contract validation"
    );
    describe_counter!(
        UNMATCHED_REQUESTS_TOTAL,
        "Requests that matched no contract operation"
    );
    describe_histogram!(
        RESPONSE_BODY_BYTES,
        "Size of response bodies drained for validation"
    );
}

/// Records one validated exchange half.
pub fn record_validation(phase: Phase, operation: &str) {
    counter!(
        VALIDATIONS_TOTAL,
        "phase" => phase.as_str(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Records a rejected exchange half.
pub fn record_validation_failure(phase: Phase, operation: &str, code: &'static str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "phase" => phase.as_str(),
        "operation" => operation.to_string(),
        "code" => code
    )
    .increment(1);
}

/// Records a request that matched no operation.
pub fn record_unmatched_request() {
    counter!(UNMATCHED_REQUESTS_TOTAL).increment(1);
}

/// Records the size of a drained response body.
pub fn record_response_size(operation: &str, size_bytes: usize) {
    histogram!(RESPONSE_BODY_BYTES, "operation" => operation.to_string())
        .record(size_bytes as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_labels() {
        assert_eq!(Phase::Request.as_str(), "request");
        assert_eq!(Phase::Response.as_str(), "response");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_validation(Phase::Request, "getPet");
        record_validation_failure(Phase::Response, "getPet", "RESPONSE_VALIDATION_FAILED");
        record_unmatched_request();
        record_response_size("getPet", 128);
    }
}

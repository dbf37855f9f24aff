//! BusTime client error types.

use thiserror::Error;

/// Errors from the BusTime HTTP client.
///
/// Variants carry owned strings rather than the underlying source errors so
/// that a single failure can be shared between every waiter of a
/// single-flight cache load.
#[derive(Debug, Clone, Error)]
pub enum BustimeError {
    /// Network-level failure (connection refused, DNS, TLS, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Response body was undecodable or the `bustime-response` wrapper
    /// element was missing
    #[error("malformed response: {0}")]
    Malformed(String),

    /// API-reported business error (bad key, bad parameter, ...)
    #[error("API returned: {0}")]
    Api(String),

    /// The API key has exhausted its transaction quota
    #[error("transaction limit exceeded: {0}")]
    QuotaExceeded(String),

    /// The API reported that no data matches the query. Container
    /// endpoints translate this into an empty sequence; it only escapes
    /// from single-record operations.
    #[error("no data: {0}")]
    NoData(String),

    /// Invalid parameter combination, rejected before any network call
    #[error("invalid call: {0}")]
    InvalidCall(String),

    /// A record decoded but could not be coerced into a domain value
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl BustimeError {
    /// Returns true if this error is a sensible candidate for
    /// caller-directed retry with backoff.
    ///
    /// Malformed responses, business errors, and local validation errors
    /// usually indicate a persistent condition and are excluded.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BustimeError::Transport(_)
                | BustimeError::Timeout { .. }
                | BustimeError::QuotaExceeded(_)
        )
    }

    /// Returns true for the "no matching data right now" signal, which is
    /// not a hard failure.
    pub fn is_no_data(&self) -> bool {
        matches!(self, BustimeError::NoData(_))
    }
}

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// A numeric field failed to parse
    #[error("invalid number in field `{field}`: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// A timestamp failed to parse or was ambiguous in the feed timezone
    #[error("invalid timestamp in field `{field}`: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    /// A coordinate pair was out of range
    #[error("invalid position: {0}")]
    InvalidPosition(&'static str),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field held a value outside its documented vocabulary
    #[error("unexpected value in field `{field}`: {value:?}")]
    UnexpectedValue { field: &'static str, value: String },
}

//! Error types for the signed-request client.
//!
//! All fallible operations return [`error_stack::Report<BunqError>`] so that
//! callers get the full chain of context that led to a failure.

use derive_more::Display;
use http::StatusCode;

use crate::envelope::error_detail;

/// Error contexts raised by the client core.
///
/// Only HTTP 429 is retried automatically; every variant below reaches the
/// caller of `execute` or the decode helpers unchanged.
#[derive(Debug, Display)]
pub enum BunqError {
    /// Key text is not a well-formed armored block or does not hold a valid key.
    #[display("Key format error: {message}")]
    KeyFormat { message: String },

    /// A signature could not be decoded from its textual form.
    #[display("Invalid signature encoding: {message}")]
    InvalidSignatureEncoding { message: String },

    /// The server signature was missing or did not match the received bytes.
    #[display("Response authenticity error: {message}")]
    ResponseAuthenticity { message: String },

    /// Non-success, non-rate-limited HTTP response. `body` is the raw payload.
    #[display("API error {status}: {}", error_detail(body))]
    Api { status: StatusCode, body: String },

    /// Success status, but the payload is not a usable response envelope.
    #[display("Malformed envelope: {message}")]
    MalformedEnvelope { message: String },

    /// The configured cap on rate-limit retries was reached.
    #[display("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// The HTTP transport failed before a response was received.
    #[display("Transport error: {message}")]
    Transport { message: String },

    /// A request body could not be serialized.
    #[display("Serialization error: {message}")]
    Serialization { message: String },

    /// Settings are missing or invalid.
    #[display("Configuration error: {message}")]
    Configuration { message: String },
}

impl core::error::Error for BunqError {}

impl BunqError {
    /// HTTP status carried by an [`BunqError::Api`] error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_server_description() {
        let err = BunqError::Api {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"Error":[{"error_description":"User credentials are incorrect."}]}"#
                .to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error 400 Bad Request: User credentials are incorrect."
        );
        assert_eq!(err.status_code(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        let err = BunqError::Api {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "API error 502 Bad Gateway: upstream down");
    }

    #[test]
    fn test_non_api_errors_have_no_status() {
        let err = BunqError::RateLimited { attempts: 3 };
        assert_eq!(err.to_string(), "Rate limited after 3 attempts");
        assert!(err.status_code().is_none());
    }
}

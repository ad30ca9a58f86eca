//! API error types and responses
//!
//! Verification rejections are plain text with a category-prefixed
//! message: decode failures, signature failures and policy failures each
//! produce a distinct message but share the same client-error status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use greenlight_core::DecodeError;

/// Request-scoped verification errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// The `dgc` query parameter is absent
    #[error("Invalid DGC")]
    MissingCredential,

    /// The credential string could not be decoded
    #[error("INVALID: {0}")]
    Decode(#[from] DecodeError),

    /// No trusted certificate validates the credential signature
    #[error("INVALID: signature")]
    UntrustedSignature,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_response_contract() {
        assert_eq!(ApiError::MissingCredential.to_string(), "Invalid DGC");
        assert_eq!(ApiError::UntrustedSignature.to_string(), "INVALID: signature");
        assert_eq!(
            ApiError::Decode(DecodeError::MissingPrefix).to_string(),
            "INVALID: missing HC1 prefix"
        );
    }
}

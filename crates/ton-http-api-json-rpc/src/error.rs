use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::envelope::ResponseEnvelope;

/// HTTP status codes used by the envelope mapping
pub mod status_codes {
    pub const OK: u16 = 200;
    pub const MALFORMED_PAYLOAD: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const NOT_FOUND: u16 = 404;
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    pub const PAYLOAD_TOO_LARGE: u16 = 413;
    pub const INVALID_ADDRESS: u16 = 416;
    pub const UNPROCESSABLE_ENTITY: u16 = 422;
    pub const TOO_MANY_REQUESTS: u16 = 429;
    pub const INTERNAL_ERROR: u16 = 500;
    pub const GATEWAY_TIMEOUT: u16 = 504;
}

/// Failure signals produced by the parameter normalizer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("non-optional argument '{0}' expected")]
    MissingRequiredParameter(String),

    #[error("can't parse integer in parameter '{0}'")]
    TypeCoercionError(String),
}

impl NormalizeError {
    /// Name of the failure kind, used as the prefix of the envelope error text
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizeError::MissingRequiredParameter(_) => "MissingRequiredParameter",
            NormalizeError::TypeCoercionError(_) => "TypeCoercionError",
        }
    }

    /// The parameter the failure refers to
    pub fn parameter(&self) -> &str {
        match self {
            NormalizeError::MissingRequiredParameter(name)
            | NormalizeError::TypeCoercionError(name) => name,
        }
    }
}

/// Every failure a request can end in, on either transport.
///
/// The mapping to status code and client-facing text lives here and nowhere
/// else; see [`GatewayError::to_envelope`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("Incorrect address")]
    InvalidAddress,

    #[error("{0}")]
    MalformedPayload(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{}: {}", .0.kind(), .0)]
    Normalize(#[from] NormalizeError),

    #[error("Unknown method")]
    UnknownMethod(String),

    #[error("Liteserver timeout")]
    Timeout,

    #[error("{0}")]
    WrongResult(String),

    /// Transport-level rejection (404, 405, 413, 401, 429, ...)
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Anything else. The detail is for logs only.
    #[error("Internal server error")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(err: impl fmt::Display) -> Self {
        GatewayError::Validation(err.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        GatewayError::MalformedPayload(message.into())
    }

    pub fn wrong_result(message: impl Into<String>) -> Self {
        GatewayError::WrongResult(message.into())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        GatewayError::Internal(err.to_string())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::http(status_codes::NOT_FOUND, "Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::http(status_codes::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidAddress => status_codes::INVALID_ADDRESS,
            GatewayError::MalformedPayload(_) => status_codes::MALFORMED_PAYLOAD,
            GatewayError::Validation(_)
            | GatewayError::Normalize(_)
            | GatewayError::UnknownMethod(_) => status_codes::UNPROCESSABLE_ENTITY,
            GatewayError::Timeout => status_codes::GATEWAY_TIMEOUT,
            GatewayError::WrongResult(_) | GatewayError::Internal(_) => {
                status_codes::INTERNAL_ERROR
            }
            GatewayError::Http { status, .. } => *status,
        }
    }

    /// Convert this error into the failure envelope returned to the caller
    pub fn to_envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::failure(self.to_string(), self.status_code())
    }

    /// Same as [`to_envelope`](Self::to_envelope), correlated with a JSON-RPC id
    pub fn to_envelope_with_id(&self, id: Option<Value>) -> ResponseEnvelope {
        self.to_envelope().with_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::InvalidAddress.status_code(), 416);
        assert_eq!(GatewayError::malformed("bad boc").status_code(), 400);
        assert_eq!(GatewayError::validation("missing field").status_code(), 422);
        assert_eq!(GatewayError::UnknownMethod("x".into()).status_code(), 422);
        assert_eq!(GatewayError::Timeout.status_code(), 504);
        assert_eq!(GatewayError::wrong_result("exit code 11").status_code(), 500);
        assert_eq!(GatewayError::internal("boom").status_code(), 500);
        assert_eq!(GatewayError::not_found().status_code(), 404);
    }

    #[test]
    fn test_error_text() {
        assert_eq!(GatewayError::InvalidAddress.to_string(), "Incorrect address");
        assert_eq!(GatewayError::Timeout.to_string(), "Liteserver timeout");
        assert_eq!(
            GatewayError::UnknownMethod("doesNotExist".into()).to_string(),
            "Unknown method"
        );
        assert_eq!(
            GatewayError::validation("field required").to_string(),
            "Validation error: field required"
        );
        assert_eq!(
            GatewayError::from(NormalizeError::TypeCoercionError("lt".into())).to_string(),
            "TypeCoercionError: can't parse integer in parameter 'lt'"
        );
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let envelope = GatewayError::internal("connection reset by peer at 0x7f").to_envelope();
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("Internal server error"));
        assert_eq!(envelope.code, Some(500));
    }

    #[test]
    fn test_normalize_error_accessors() {
        let err = NormalizeError::MissingRequiredParameter("address".into());
        assert_eq!(err.kind(), "MissingRequiredParameter");
        assert_eq!(err.parameter(), "address");
    }
}

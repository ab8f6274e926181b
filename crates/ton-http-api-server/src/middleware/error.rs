//! Middleware error types

use thiserror::Error;
use ton_http_api_json_rpc::{GatewayError, status_codes};

/// Errors a middleware can short-circuit a request with.
///
/// They are enveloped like every other failure; see
/// [`MiddlewareError::to_gateway_error`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiddlewareError {
    /// API key not recognised
    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    RateLimitExceeded {
        message: String,
        /// Seconds until the current window resets
        retry_after: Option<u64>,
    },
}

impl MiddlewareError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn rate_limit(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimitExceeded {
            message: msg.into(),
            retry_after,
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn to_gateway_error(&self) -> GatewayError {
        match self {
            Self::Unauthorized(msg) => GatewayError::http(status_codes::UNAUTHORIZED, msg.clone()),
            Self::RateLimitExceeded { message, .. } => {
                GatewayError::http(status_codes::TOO_MANY_REQUESTS, message.clone())
            }
        }
    }
}

impl From<MiddlewareError> for GatewayError {
    fn from(err: MiddlewareError) -> Self {
        err.to_gateway_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err = MiddlewareError::unauthorized("API key does not exist");
        assert_eq!(err.to_gateway_error().status_code(), 401);
        assert_eq!(err.to_gateway_error().to_string(), "API key does not exist");

        let err = MiddlewareError::rate_limit("Ratelimit exceeded", Some(60));
        assert_eq!(err.retry_after(), Some(60));
        assert_eq!(err.to_gateway_error().status_code(), 429);
    }
}

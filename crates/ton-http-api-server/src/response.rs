//! Envelope to HTTP response conversion

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue, RETRY_AFTER};
use hyper::{Response, StatusCode};
use tracing::error;
use ton_http_api_json_rpc::DispatchOutcome;

const SERIALIZATION_FAILURE: &str =
    r#"{"ok":false,"error":"Internal server error","code":500}"#;

/// JSON response carrying the outcome's envelope and status
pub fn envelope_response(outcome: &DispatchOutcome) -> Response<Full<Bytes>> {
    let (status, body) = match outcome.envelope.to_json() {
        Ok(json) => (
            StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Bytes::from(json),
        ),
        Err(err) => {
            error!("Failed to serialize response envelope: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(SERIALIZATION_FAILURE.as_bytes()),
            )
        }
    };

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub fn with_retry_after(mut response: Response<Full<Bytes>>, seconds: u64) -> Response<Full<Bytes>> {
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(seconds));
    response
}

/// Empty 204 answer to a CORS preflight
pub fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

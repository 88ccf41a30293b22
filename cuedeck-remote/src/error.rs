//! Gateway error types
//!
//! Every failure a remote caller can see maps onto one HTTP status and a
//! `{statusCode, error, message}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No playback host attached, or it went away mid-request
    #[error("Unable to connect to the playback host")]
    HostUnavailable,

    /// The host did not answer within the request timeout
    #[error("Request Timeout")]
    RequestTimeout,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::HostUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::HostUnavailable.status().as_u16(), 503);
        assert_eq!(GatewayError::RequestTimeout.status().as_u16(), 408);
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            status_code: 503,
            error: "Service Unavailable".into(),
            message: GatewayError::HostUnavailable.to_string(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["statusCode"], 503);
        assert_eq!(value["error"], "Service Unavailable");
        assert_eq!(value["message"], "Unable to connect to the playback host");
    }
}

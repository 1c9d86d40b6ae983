//! Errors returned by the Azure Resource Manager client

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error from a management API request
#[derive(Error, Debug)]
pub enum ArmError {
    /// 400
    #[error("Bad request ({code}): {message}")]
    BadRequest { code: String, message: String },

    /// 401
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// 403
    #[error("Authorization failed ({code}): {message}")]
    Forbidden { code: String, message: String },

    /// 404
    #[error("Not found ({code}): {message}")]
    NotFound { code: String, message: String },

    /// 409 / 412
    #[error("Conflict ({code}): {message}")]
    Conflict { code: String, message: String },

    /// 429
    #[error("Throttled: {message}")]
    Throttled { message: String },

    /// 5xx
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Any other unexpected status
    #[error("HTTP {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Token acquisition failed
    #[error("Token request failed: {0}")]
    Token(String),

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body or headers could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be built from the given settings
    #[error("Client configuration error: {0}")]
    Configuration(String),
}

/// Result type for management API calls
pub type Result<T> = std::result::Result<T, ArmError>;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ArmError {
    /// Build an error from a non-success status and its response body
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_else(|| ErrorBody {
                code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: body.trim().to_string(),
            });
        let ErrorBody { code, message } = detail;

        match status.as_u16() {
            400 => ArmError::BadRequest { code, message },
            401 => ArmError::AuthenticationFailed { message },
            403 => ArmError::Forbidden { code, message },
            404 => ArmError::NotFound { code, message },
            409 | 412 => ArmError::Conflict { code, message },
            429 => ArmError::Throttled { message },
            s if (500..600).contains(&s) => ArmError::ServerError { status: s, message },
            s => ArmError::Api {
                status: s,
                code,
                message,
            },
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound { .. })
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ArmError::AuthenticationFailed { .. } | ArmError::Forbidden { .. } | ArmError::Token(_)
        )
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ArmError::Conflict { .. })
    }

    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ArmError::BadRequest { .. })
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, ArmError::ServerError { .. })
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ArmError::Throttled { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ArmError::Request(e) if e.is_timeout())
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_rate_limited() || self.is_server_error() || self.is_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_parses_envelope() {
        let body = r#"{"error":{"code":"ResourceGroupNotFound","message":"Resource group 'rg' could not be found."}}"#;
        let err = ArmError::from_response(StatusCode::NOT_FOUND, body);

        assert!(err.is_not_found());
        assert!(err.to_string().contains("ResourceGroupNotFound"));
    }

    #[test]
    fn test_from_response_without_envelope() {
        let err = ArmError::from_response(StatusCode::BAD_GATEWAY, "upstream died");
        assert!(err.is_server_error());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("upstream died"));
    }

    #[test]
    fn test_status_classification() {
        assert!(ArmError::from_response(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(ArmError::from_response(StatusCode::FORBIDDEN, "").is_unauthorized());
        assert!(ArmError::from_response(StatusCode::CONFLICT, "").is_conflict());
        assert!(ArmError::from_response(StatusCode::PRECONDITION_FAILED, "").is_conflict());
        assert!(ArmError::from_response(StatusCode::TOO_MANY_REQUESTS, "").is_rate_limited());
        assert!(ArmError::from_response(StatusCode::BAD_REQUEST, "").is_bad_request());

        let teapot = ArmError::from_response(StatusCode::IM_A_TEAPOT, "");
        assert!(matches!(teapot, ArmError::Api { status: 418, .. }));
        assert!(!teapot.is_retryable());
    }
}

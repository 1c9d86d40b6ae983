//! Unified error handling for azsqlctl-core
//!
//! Every operation in this crate returns [`CoreError`]. Nothing is logged and
//! swallowed at the point of failure: the caller decides whether an error is
//! fatal or a warning.
//!
//! # Example
//!
//! ```rust
//! use azsqlctl_core::CoreError;
//! use std::time::Duration;
//!
//! fn handle_error(err: &CoreError) {
//!     if err.is_unauthorized() {
//!         println!("Check the service principal environment variables");
//!     } else if err.is_retryable() {
//!         println!("Temporary error, can retry");
//!     }
//! }
//!
//! let err = CoreError::OperationTimeout(Duration::from_secs(600));
//! assert!(err.is_timeout());
//! handle_error(&err);
//! ```

use crate::arm::ArmError;
use crate::config::ConfigError;
use crate::workflows::ProvisionStep;
use std::time::Duration;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// No credentials available to talk to the management API
    #[error("Missing credential: environment variable {variable} is not set")]
    MissingCredential { variable: String },

    /// Error from the management API
    #[error("Management API error: {0}")]
    Management(#[from] ArmError),

    /// A provisioning step failed
    #[error("Provisioning step '{step}' failed: {source}")]
    Provision {
        step: ProvisionStep,
        #[source]
        source: Box<CoreError>,
    },

    /// Long-running operation reached a failed or canceled state
    #[error("Operation '{operation}' failed: {message}")]
    OperationFailed { operation: String, message: String },

    /// Long-running operation did not finish in time
    #[error("Operation timed out after {0:?}")]
    OperationTimeout(Duration),

    /// TCP or TDS connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Connection plus liveness probe did not finish in time
    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Error reported by the database or the TDS driver
    #[error("SQL error: {0}")]
    Sql(#[from] tiberius::error::Error),

    /// A row could not be decoded into the expected shape
    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Invalid input (unknown column, bad parameter name, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// The underlying error, looking through provisioning step context
    #[must_use]
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::Provision { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), CoreError::Management(e) if e.is_not_found())
    }

    /// Returns true if credentials are missing or were rejected
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self.root() {
            CoreError::MissingCredential { .. } => true,
            CoreError::Management(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self.root() {
            CoreError::Management(e) => e.is_timeout(),
            CoreError::OperationTimeout(_) | CoreError::ConnectTimeout(_) => true,
            _ => false,
        }
    }

    /// Returns true if this is a conflict/precondition error (409/412)
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), CoreError::Management(e) if e.is_conflict())
    }

    /// Returns true if this is a bad request error (400) or invalid input
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        match self.root() {
            CoreError::Management(e) => e.is_bad_request(),
            CoreError::Validation(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            CoreError::Management(e) => e.is_retryable(),
            CoreError::OperationTimeout(_) | CoreError::ConnectTimeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn arm(status: StatusCode) -> CoreError {
        ArmError::from_response(status, "").into()
    }

    #[test]
    fn test_core_error_from_arm() {
        let core_err = arm(StatusCode::NOT_FOUND);

        assert!(core_err.is_not_found());
        assert!(!core_err.is_unauthorized());
        assert!(!core_err.is_retryable());
    }

    #[test]
    fn test_missing_credential_is_unauthorized() {
        let err = CoreError::MissingCredential {
            variable: "AZURE_TENANT_ID".to_string(),
        };
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("AZURE_TENANT_ID"));
    }

    #[test]
    fn test_provision_context_delegates_helpers() {
        let err = CoreError::Provision {
            step: ProvisionStep::Server,
            source: Box::new(arm(StatusCode::TOO_MANY_REQUESTS)),
        };

        assert!(err.is_retryable());
        assert!(matches!(err.root(), CoreError::Management(_)));
        assert!(err.to_string().contains("server"));
    }

    #[test]
    fn test_timeouts() {
        let err = CoreError::OperationTimeout(Duration::from_secs(600));
        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert!(!err.is_not_found());

        let err = CoreError::ConnectTimeout(Duration::from_secs(30));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err = CoreError::Validation("unknown column 'Nmae'".to_string());
        assert!(err.is_bad_request());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflict_helper() {
        assert!(arm(StatusCode::CONFLICT).is_conflict());
        assert!(!arm(StatusCode::BAD_REQUEST).is_conflict());
        assert!(arm(StatusCode::BAD_REQUEST).is_bad_request());
    }
}

//! Long-running operation handles
//!
//! Mutating management calls (PUT/DELETE) may return before the resource is
//! ready. The response headers say how to follow up:
//!
//! - `Azure-AsyncOperation`: poll that URL; the body carries a `status` that
//!   ends as `Succeeded`, `Failed` or `Canceled`.
//! - `Location` on a 202: poll that URL until it stops answering 202.
//! - 201 with a non-terminal `provisioningState`: poll the resource itself.
//! - Anything else: the operation already completed.
//!
//! `Retry-After` (seconds) on any of these replaces the client's poll interval.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::client::ArmResponse;
use super::error::ErrorBody;

pub(crate) const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
pub(crate) const LOCATION_HEADER: &str = "location";
pub(crate) const RETRY_AFTER_HEADER: &str = "retry-after";

/// Where to look for completion of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    /// Operation status monitor (`Azure-AsyncOperation`)
    AsyncOperation(String),
    /// Location monitor: in progress while it answers 202
    Location(String),
    /// The resource's own `properties.provisioningState`
    Resource(String),
    /// Nothing to wait for
    Completed,
}

/// Handle to a management operation that may still be running
///
/// Dependent steps must not start until the handle has been awaited with
/// [`wait_for_completion`](crate::progress::wait_for_completion).
#[must_use = "long-running operations must be awaited before dependent steps run"]
#[derive(Debug, Clone)]
pub struct LongRunningOperation {
    description: String,
    target: PollTarget,
    retry_after: Option<Duration>,
}

impl LongRunningOperation {
    /// Build a handle from the response to the initiating request
    ///
    /// `resource_url` is the absolute URL (with `api-version`) of the resource
    /// being created, used when the service only reports a provisioning state.
    pub fn from_response(
        description: impl Into<String>,
        response: &ArmResponse,
        resource_url: Option<&str>,
    ) -> Self {
        let target = if let Some(url) = response.header(ASYNC_OPERATION_HEADER) {
            PollTarget::AsyncOperation(url.to_string())
        } else if response.status == StatusCode::ACCEPTED
            && let Some(url) = response.header(LOCATION_HEADER)
        {
            PollTarget::Location(url.to_string())
        } else if response.status == StatusCode::CREATED
            && let Some(url) = resource_url
            && provisioning_state(&response.body)
                .is_some_and(|state| !OperationState::parse(&state).is_terminal())
        {
            PollTarget::Resource(url.to_string())
        } else {
            PollTarget::Completed
        };

        Self {
            description: description.into(),
            target,
            retry_after: parse_retry_after(response),
        }
    }

    /// Handle for an operation that finished synchronously
    pub fn completed(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            target: PollTarget::Completed,
            retry_after: None,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_completed(&self) -> bool {
        self.target == PollTarget::Completed
    }
}

/// Normalized state of a running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    InProgress(String),
    Succeeded,
    Failed(String),
    Canceled,
}

impl OperationState {
    /// Parse a status or provisioning state (case-insensitive)
    pub fn parse(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "succeeded" => OperationState::Succeeded,
            "failed" => OperationState::Failed(String::new()),
            "canceled" | "cancelled" => OperationState::Canceled,
            _ => OperationState::InProgress(status.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationState::InProgress(_))
    }

    /// Short label used in progress events
    pub fn label(&self) -> &str {
        match self {
            OperationState::InProgress(status) => status,
            OperationState::Succeeded => "Succeeded",
            OperationState::Failed(_) => "Failed",
            OperationState::Canceled => "Canceled",
        }
    }
}

/// Body of an `Azure-AsyncOperation` status monitor
#[derive(Debug, Deserialize)]
pub(crate) struct OperationStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

impl OperationStatus {
    pub fn state(&self) -> OperationState {
        match OperationState::parse(&self.status) {
            OperationState::Failed(_) => {
                let message = self
                    .error
                    .as_ref()
                    .map(|e| {
                        if e.code.is_empty() {
                            e.message.clone()
                        } else {
                            format!("{}: {}", e.code, e.message)
                        }
                    })
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "operation reported status Failed".to_string());
                OperationState::Failed(message)
            }
            other => other,
        }
    }
}

#[derive(Deserialize)]
struct ProvisioningEnvelope {
    #[serde(default)]
    properties: Option<ProvisioningProperties>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

/// `properties.provisioningState` of a resource body, if present
pub(crate) fn provisioning_state(body: &str) -> Option<String> {
    serde_json::from_str::<ProvisioningEnvelope>(body)
        .ok()?
        .properties?
        .provisioning_state
}

/// `Retry-After` in whole seconds; HTTP dates are ignored
pub(crate) fn parse_retry_after(response: &ArmResponse) -> Option<Duration> {
    response
        .header(RETRY_AFTER_HEADER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

//! Progress tracking and polling for long-running management operations
//!
//! Mutating management calls return a [`LongRunningOperation`] which must be
//! polled until it reaches a terminal state. This module does that polling
//! with optional progress callbacks for UI updates.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::debug;

use crate::arm::operation::{OperationStatus, parse_retry_after, provisioning_state};
use crate::arm::{ArmClient, LongRunningOperation, OperationState, PollTarget};
use crate::config::TimeoutConfig;
use crate::error::{CoreError, Result};

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Waiting has started
    Started { operation: String },
    /// Polling iteration with current status
    Polling {
        operation: String,
        status: String,
        elapsed: Duration,
    },
    /// Operation completed successfully
    Completed { operation: String, elapsed: Duration },
    /// Operation failed, was canceled or timed out
    Failed { operation: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive spinners; library callers usually pass `None`.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Bounds for waiting on an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between polls unless the service sends `Retry-After`
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for WaitOptions {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            timeout: config.operation_timeout(),
            interval: config.poll_interval(),
        }
    }
}

/// Outcome of a successfully awaited operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedOperation {
    pub description: String,
    /// Number of status requests made; zero when it completed synchronously
    pub polls: u32,
    pub elapsed: Duration,
}

/// Poll a long-running operation until completion
///
/// # Arguments
///
/// * `client` - The management API client
/// * `operation` - Handle returned by the initiating call
/// * `timeout` - Maximum time to wait for completion
/// * `interval` - Time between polls; a `Retry-After` header overrides it
/// * `on_progress` - Optional callback for progress updates
///
/// # Returns
///
/// Polling statistics, or an error if the operation failed, was canceled or
/// timed out. A failed status request is returned as-is.
///
/// # Example
///
/// ```rust,ignore
/// use azsqlctl_core::{wait_for_completion, ProgressEvent};
/// use std::time::Duration;
///
/// let operation = servers.create_or_update("rg", "srv", &server).await?;
///
/// let callback: ProgressCallback = Box::new(|event| {
///     if let ProgressEvent::Polling { status, elapsed, .. } = event {
///         println!("Status: {} ({:.0}s)", status, elapsed.as_secs());
///     }
/// });
/// wait_for_completion(
///     &client,
///     operation,
///     Duration::from_secs(600),
///     Duration::from_secs(10),
///     Some(&callback),
/// )
/// .await?;
/// ```
pub async fn wait_for_completion(
    client: &ArmClient,
    operation: LongRunningOperation,
    timeout: Duration,
    interval: Duration,
    on_progress: Option<&ProgressCallback>,
) -> Result<CompletedOperation> {
    let start = Instant::now();
    let description = operation.description().to_string();

    emit(
        on_progress,
        ProgressEvent::Started {
            operation: description.clone(),
        },
    );

    let url = match operation.target() {
        PollTarget::Completed => {
            emit(
                on_progress,
                ProgressEvent::Completed {
                    operation: description.clone(),
                    elapsed: start.elapsed(),
                },
            );
            return Ok(CompletedOperation {
                description,
                polls: 0,
                elapsed: start.elapsed(),
            });
        }
        PollTarget::AsyncOperation(url) | PollTarget::Location(url) | PollTarget::Resource(url) => {
            url.clone()
        }
    };

    // The initial Retry-After is honored before the first poll
    let mut next_delay = operation.retry_after();
    let mut polls = 0u32;

    loop {
        if let Some(delay) = next_delay.take() {
            // Never sleep past the deadline
            let remaining = timeout.saturating_sub(start.elapsed());
            tokio::time::sleep(delay.min(remaining)).await;
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            emit(
                on_progress,
                ProgressEvent::Failed {
                    operation: description.clone(),
                    error: format!("timed out after {:?}", timeout),
                },
            );
            return Err(CoreError::OperationTimeout(timeout));
        }

        let response = client.get_absolute(&url).await?;
        polls += 1;

        let state = match operation.target() {
            PollTarget::AsyncOperation(_) => response.json::<OperationStatus>()?.state(),
            PollTarget::Location(_) if response.status == StatusCode::ACCEPTED => {
                OperationState::InProgress("Accepted".to_string())
            }
            PollTarget::Resource(_) => match provisioning_state(&response.body) {
                Some(state) => OperationState::parse(&state),
                None => OperationState::Succeeded,
            },
            _ => OperationState::Succeeded,
        };

        debug!(
            operation = %description,
            status = %state.label(),
            poll = polls,
            "Polled long-running operation"
        );
        emit(
            on_progress,
            ProgressEvent::Polling {
                operation: description.clone(),
                status: state.label().to_string(),
                elapsed,
            },
        );

        match state {
            OperationState::Succeeded => {
                let elapsed = start.elapsed();
                emit(
                    on_progress,
                    ProgressEvent::Completed {
                        operation: description.clone(),
                        elapsed,
                    },
                );
                return Ok(CompletedOperation {
                    description,
                    polls,
                    elapsed,
                });
            }
            OperationState::Failed(message) => {
                let message = if message.is_empty() {
                    "operation reported status Failed".to_string()
                } else {
                    message
                };
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        operation: description.clone(),
                        error: message.clone(),
                    },
                );
                return Err(CoreError::OperationFailed {
                    operation: description,
                    message,
                });
            }
            OperationState::Canceled => {
                let message = "operation was canceled".to_string();
                emit(
                    on_progress,
                    ProgressEvent::Failed {
                        operation: description.clone(),
                        error: message.clone(),
                    },
                );
                return Err(CoreError::OperationFailed {
                    operation: description,
                    message,
                });
            }
            OperationState::InProgress(_) => {
                next_delay = Some(parse_retry_after(&response).unwrap_or(interval));
            }
        }
    }
}

/// Helper to emit progress events
fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}

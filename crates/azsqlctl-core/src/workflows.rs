//! Provisioning workflows - multi-step management operations
//!
//! These workflows compose the management API calls with operation polling.
//! Provisioning runs its steps strictly in order (resource group, server,
//! firewall rule, database) and never starts a step before the previous
//! one's long-running operation has completed.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::arm::{
    ArmClient, Database, DatabaseHandler, FirewallRuleHandler, ResourceGroup,
    ResourceGroupHandler, Server, ServerHandler,
};
use crate::error::{CoreError, Result};
use crate::params::ProvisionSpec;
use crate::progress::{CompletedOperation, ProgressCallback, WaitOptions, wait_for_completion};

/// What to do when a provisioning step fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed step
    #[default]
    Abort,
    /// Record the failure as a warning and run the remaining steps
    Continue,
}

/// One step of provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisionStep {
    ResourceGroup,
    Server,
    FirewallRule,
    Database,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::ResourceGroup => "resource group",
            ProvisionStep::Server => "server",
            ProvisionStep::FirewallRule => "firewall rule",
            ProvisionStep::Database => "database",
        };
        f.write_str(name)
    }
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StepOutcome {
    Completed { elapsed_secs: u64 },
    Skipped,
    Failed { error: String },
}

/// Per-step record of a provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: ProvisionStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Outcome of [`provision`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub steps: Vec<StepReport>,
}

impl ProvisionReport {
    /// True when no step failed
    pub fn is_complete(&self) -> bool {
        !self
            .steps
            .iter()
            .any(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
    }

    /// Failed steps with their error text
    pub fn failures(&self) -> impl Iterator<Item = (ProvisionStep, &str)> {
        self.steps.iter().filter_map(|s| match &s.outcome {
            StepOutcome::Failed { error } => Some((s.step, error.as_str())),
            _ => None,
        })
    }

    fn record(&mut self, step: ProvisionStep, outcome: StepOutcome) {
        self.steps.push(StepReport { step, outcome });
    }
}

/// Create (or update) the resource group
///
/// Resource group creation completes synchronously.
pub async fn create_resource_group(client: &ArmClient, spec: &ProvisionSpec) -> Result<ResourceGroup> {
    let handler = ResourceGroupHandler::new(client.clone());
    let group = handler
        .create_or_update(&spec.resource_group, &spec.resource_group_request())
        .await?;
    Ok(group)
}

/// Create a logical server and wait for completion
///
/// This is a convenience workflow that:
/// 1. Submits the server (returns an operation handle)
/// 2. Polls the operation until completion
/// 3. Fetches and returns the created server
pub async fn create_server_and_wait(
    client: &ArmClient,
    spec: &ProvisionSpec,
    wait: WaitOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<Server> {
    let handler = ServerHandler::new(client.clone());

    // Step 1: Submit
    let operation = handler
        .create_or_update(&spec.resource_group, &spec.server, &spec.server_request())
        .await?;

    // Step 2: Poll until complete
    wait_for_completion(client, operation, wait.timeout, wait.interval, on_progress).await?;

    // Step 3: Fetch the created resource
    let server = handler.get(&spec.resource_group, &spec.server).await?;
    Ok(server)
}

/// Create the firewall rule and wait for completion
///
/// Returns `Ok(None)` when the spec has no firewall rule.
pub async fn create_firewall_rule_and_wait(
    client: &ArmClient,
    spec: &ProvisionSpec,
    wait: WaitOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<Option<CompletedOperation>> {
    let (Some(rule), Some(request)) = (spec.firewall.as_ref(), spec.firewall_request()) else {
        return Ok(None);
    };

    let handler = FirewallRuleHandler::new(client.clone());
    let operation = handler
        .create_or_update(&spec.resource_group, &spec.server, &rule.name, &request)
        .await?;

    let completed =
        wait_for_completion(client, operation, wait.timeout, wait.interval, on_progress).await?;
    Ok(Some(completed))
}

/// Create a database and wait for completion
///
/// Seeding from a sample can take several minutes.
pub async fn create_database_and_wait(
    client: &ArmClient,
    spec: &ProvisionSpec,
    wait: WaitOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<Database> {
    let handler = DatabaseHandler::new(client.clone());

    let operation = handler
        .create_or_update(
            &spec.resource_group,
            &spec.server,
            &spec.database.name,
            &spec.database_request(),
        )
        .await?;

    wait_for_completion(client, operation, wait.timeout, wait.interval, on_progress).await?;

    let database = handler
        .get(&spec.resource_group, &spec.server, &spec.database.name)
        .await?;
    Ok(database)
}

/// Provision resource group, server, firewall rule and database in order
///
/// With [`FailurePolicy::Abort`] the first failure is returned as
/// [`CoreError::Provision`] naming the step. With [`FailurePolicy::Continue`]
/// every step runs and failures are recorded in the report and logged as
/// warnings.
///
/// # Example
///
/// ```rust,ignore
/// let spec = ProvisionSpec::from_profile(&profile)?;
/// let report = provision(&client, &spec, WaitOptions::default(), FailurePolicy::Abort, None).await?;
/// assert!(report.is_complete());
/// ```
pub async fn provision(
    client: &ArmClient,
    spec: &ProvisionSpec,
    wait: WaitOptions,
    policy: FailurePolicy,
    on_progress: Option<&ProgressCallback>,
) -> Result<ProvisionReport> {
    let mut report = ProvisionReport::default();

    let start = Instant::now();
    let outcome = create_resource_group(client, spec).await.map(|_| ());
    settle(&mut report, ProvisionStep::ResourceGroup, start, outcome, policy)?;

    let start = Instant::now();
    let outcome = create_server_and_wait(client, spec, wait, on_progress)
        .await
        .map(|_| ());
    settle(&mut report, ProvisionStep::Server, start, outcome, policy)?;

    if spec.firewall.is_some() {
        let start = Instant::now();
        let outcome = create_firewall_rule_and_wait(client, spec, wait, on_progress)
            .await
            .map(|_| ());
        settle(&mut report, ProvisionStep::FirewallRule, start, outcome, policy)?;
    } else {
        report.record(ProvisionStep::FirewallRule, StepOutcome::Skipped);
    }

    let start = Instant::now();
    let outcome = create_database_and_wait(client, spec, wait, on_progress)
        .await
        .map(|_| ());
    settle(&mut report, ProvisionStep::Database, start, outcome, policy)?;

    Ok(report)
}

fn settle(
    report: &mut ProvisionReport,
    step: ProvisionStep,
    start: Instant,
    outcome: Result<()>,
    policy: FailurePolicy,
) -> Result<()> {
    match outcome {
        Ok(()) => {
            let elapsed = start.elapsed();
            info!(step = %step, elapsed_secs = elapsed.as_secs(), "Provisioning step completed");
            report.record(
                step,
                StepOutcome::Completed {
                    elapsed_secs: elapsed.as_secs(),
                },
            );
            Ok(())
        }
        Err(error) => match policy {
            FailurePolicy::Abort => Err(CoreError::Provision {
                step,
                source: Box::new(error),
            }),
            FailurePolicy::Continue => {
                warn!(step = %step, error = %error, "Provisioning step failed, continuing");
                report.record(
                    step,
                    StepOutcome::Failed {
                        error: error.to_string(),
                    },
                );
                Ok(())
            }
        },
    }
}

/// Delete a resource group and wait for completion
///
/// Deleting the group removes the server, firewall rule and database with it.
pub async fn deprovision(
    client: &ArmClient,
    resource_group: &str,
    wait: WaitOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<CompletedOperation> {
    let handler = ResourceGroupHandler::new(client.clone());

    let operation = handler.delete(resource_group).await?;
    let completed =
        wait_for_completion(client, operation, wait.timeout, wait.interval, on_progress).await?;

    info!(
        resource_group = %resource_group,
        elapsed_secs = completed.elapsed.as_secs(),
        "Resource group deleted"
    );
    Ok(completed)
}

/// Whether a resource group currently exists
pub async fn resource_group_exists(client: &ArmClient, resource_group: &str) -> Result<bool> {
    let handler = ResourceGroupHandler::new(client.clone());
    Ok(handler.exists(resource_group).await?)
}

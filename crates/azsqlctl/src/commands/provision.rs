//! Management commands: provision and deprovision

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::debug;

use azsqlctl_core::arm::ArmClient;
use azsqlctl_core::{
    CompletedOperation, FailurePolicy, ProgressCallback, ProgressEvent, ProvisionReport,
    ProvisionSpec, StepOutcome, WaitOptions, deprovision, provision, resource_group_exists,
};

use crate::cli::OutputFormat;
use crate::connection::ConnectionManager;
use crate::error::{AzSqlCtlError, Result as CliResult};
use crate::output::Reporter;

/// Spinner that follows long-running operations
///
/// Finished operations are printed above the spinner so a multi-step run
/// leaves one line per operation behind. Structured output gets no spinner.
pub(crate) fn operation_spinner(message: &str, reporter: &Reporter) -> ProgressBar {
    if !reporter.is_human() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb
}

pub(crate) fn spinner_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = pb.clone();
    Box::new(move |event: ProgressEvent| match event {
        ProgressEvent::Started { operation } => {
            pb.set_message(format!("{}...", operation));
        }
        ProgressEvent::Polling {
            operation,
            status,
            elapsed,
        } => {
            pb.set_message(format!(
                "{}: {} ({:.0}s)",
                operation,
                status,
                elapsed.as_secs_f64()
            ));
        }
        ProgressEvent::Completed { operation, elapsed } => {
            pb.println(format!("\u{2713} {} ({:.0}s)", operation, elapsed.as_secs_f64()));
        }
        ProgressEvent::Failed { operation, error } => {
            pb.println(format!("\u{2717} {}: {}", operation, error));
        }
    })
}

/// What `provision` prints in structured formats
#[derive(Debug, Serialize)]
pub(crate) struct ProvisionOutput<'a> {
    pub resource_group: &'a str,
    pub server: &'a str,
    pub database: &'a str,
    pub policy: FailurePolicy,
    #[serde(flatten)]
    pub report: &'a ProvisionReport,
}

/// What `deprovision` prints in structured formats
#[derive(Debug, Serialize)]
pub(crate) struct DeprovisionOutput<'a> {
    pub resource_group: &'a str,
    pub polls: u32,
    pub elapsed_secs: u64,
    pub exists_afterwards: bool,
}

/// Run every provisioning step behind a spinner and report each step
pub(crate) async fn run_provision(
    client: &ArmClient,
    spec: &ProvisionSpec,
    wait: WaitOptions,
    policy: FailurePolicy,
    reporter: &Reporter,
) -> CliResult<ProvisionReport> {
    reporter.line(format!(
        "Provisioning {} / {} / {} in {}",
        spec.resource_group, spec.server, spec.database.name, spec.location
    ));

    let pb = operation_spinner("Provisioning...", reporter);
    let callback = spinner_callback(&pb);
    let result = provision(client, spec, wait, policy, Some(&callback)).await;
    pb.finish_and_clear();

    let report = result?;
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Completed { elapsed_secs } => {
                reporter.line(format!("{}: completed in {}s", step.step, elapsed_secs))
            }
            StepOutcome::Skipped => reporter.line(format!("{}: skipped", step.step)),
            StepOutcome::Failed { error } => {
                reporter.line(format!("warning: {} failed: {}", step.step, error))
            }
        }
    }
    Ok(report)
}

/// Delete the resource group behind a spinner and confirm it is gone
pub(crate) async fn run_deprovision(
    client: &ArmClient,
    resource_group: &str,
    wait: WaitOptions,
    reporter: &Reporter,
) -> CliResult<(CompletedOperation, bool)> {
    reporter.line(format!("Deleting resource group {}", resource_group));

    let pb = operation_spinner("Deleting resource group...", reporter);
    let callback = spinner_callback(&pb);
    let result = deprovision(client, resource_group, wait, Some(&callback)).await;
    pb.finish_and_clear();

    let completed = result?;
    let exists = resource_group_exists(client, resource_group).await?;
    if exists {
        reporter.line(format!(
            "warning: resource group {} is still listed after deletion",
            resource_group
        ));
    } else {
        reporter.line(format!(
            "Resource group {} deleted in {}s",
            resource_group,
            completed.elapsed.as_secs()
        ));
    }
    Ok((completed, exists))
}

pub fn failure_policy(best_effort: bool) -> FailurePolicy {
    if best_effort {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    }
}

/// `azsqlctl provision`
pub async fn handle_provision(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    best_effort: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (name, profile) = conn_mgr.profile(profile_name)?;
    let client = conn_mgr.arm_client(profile)?;
    let spec = conn_mgr.provision_spec(profile)?;
    let wait = conn_mgr.wait_options(profile);
    let policy = failure_policy(best_effort);
    debug!(profile = %name, ?policy, "Provisioning");

    let reporter = Reporter::new(output_format);
    let report = run_provision(&client, &spec, wait, policy, &reporter).await?;

    reporter.data(&ProvisionOutput {
        resource_group: &spec.resource_group,
        server: &spec.server,
        database: &spec.database.name,
        policy,
        report: &report,
    })?;

    if report.is_complete() {
        Ok(())
    } else {
        Err(AzSqlCtlError::ProvisioningIncomplete {
            failed: report.failures().count(),
        })
    }
}

/// `azsqlctl deprovision`
pub async fn handle_deprovision(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (_, profile) = conn_mgr.profile(profile_name)?;
    let client = conn_mgr.arm_client(profile)?;
    let wait = conn_mgr.wait_options(profile);

    let reporter = Reporter::new(output_format);
    let (completed, exists) =
        run_deprovision(&client, &profile.resource_group, wait, &reporter).await?;

    reporter.data(&DeprovisionOutput {
        resource_group: &profile.resource_group,
        polls: completed.polls,
        elapsed_secs: completed.elapsed.as_secs(),
        exists_afterwards: exists,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_selects_continue() {
        assert_eq!(failure_policy(true), FailurePolicy::Continue);
        assert_eq!(failure_policy(false), FailurePolicy::Abort);
    }

    #[test]
    fn test_provision_output_flattens_steps() {
        let report = ProvisionReport::default();
        let output = ProvisionOutput {
            resource_group: "azsql-demo",
            server: "azsql-demo-srv",
            database: "quickstart",
            policy: FailurePolicy::Continue,
            report: &report,
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["policy"], "continue");
        assert!(value["steps"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_structured_output_hides_spinner() {
        let reporter = Reporter::new(OutputFormat::Json);
        assert!(operation_spinner("Provisioning...", &reporter).is_hidden());
    }
}

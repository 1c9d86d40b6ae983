//! `azsqlctl run`: provision, exercise the database, tear down
//!
//! Teardown runs whenever provisioning was attempted, including after a
//! failed data step, unless `--keep` is given. A teardown failure is a
//! warning; the first error of the run is what the command returns.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use azsqlctl_core::ProvisionReport;
use azsqlctl_core::arm::ArmClient;
use azsqlctl_core::sql::{ConnectionSettings, OrderLine, OrmReport};
use azsqlctl_core::{ProvisionSpec, WaitOptions};

use super::data::{
    ConnectOutput, InsertOutput, random_category_name, run_connect, run_insert, run_orm, run_proc,
    run_query,
};
use super::provision::{failure_policy, run_deprovision, run_provision};
use crate::cli::OutputFormat;
use crate::connection::ConnectionManager;
use crate::error::{AzSqlCtlError, Result as CliResult};
use crate::output::Reporter;

/// Options of `azsqlctl run`
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub best_effort: bool,
    pub keep: bool,
    pub order_id: i32,
    pub parent_id: i32,
}

/// Everything a run observed, printed in structured formats
#[derive(Debug, Serialize)]
struct RunSummary {
    profile: String,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provision: Option<ProvisionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connect: Option<ConnectOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    insert: Option<InsertOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<Vec<OrderLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    procedure: Option<Vec<OrderLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_matches_procedure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orm: Option<OrmReport>,
    deprovisioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RunSummary {
    fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            provision: None,
            connect: None,
            insert: None,
            query: None,
            procedure: None,
            query_matches_procedure: None,
            orm: None,
            deprovisioned: false,
            error: None,
        }
    }
}

struct RunContext<'a> {
    client: &'a ArmClient,
    spec: &'a ProvisionSpec,
    settings: &'a ConnectionSettings,
    wait: WaitOptions,
    reporter: &'a Reporter,
}

/// Provision then run every data operation, filling `summary` as it goes
async fn exercise(
    ctx: &RunContext<'_>,
    options: RunOptions,
    summary: &mut RunSummary,
) -> CliResult<()> {
    let reporter = ctx.reporter;

    let report = run_provision(
        ctx.client,
        ctx.spec,
        ctx.wait,
        failure_policy(options.best_effort),
        reporter,
    )
    .await?;
    let incomplete = report.failures().count();
    summary.provision = Some(report);

    summary.connect = Some(run_connect(ctx.settings, reporter).await?);

    let name = random_category_name();
    summary.insert = Some(run_insert(ctx.settings, options.parent_id, &name, reporter).await?);

    let queried = run_query(ctx.settings, options.order_id, reporter).await?;
    let procedure = run_proc(ctx.settings, options.order_id, reporter).await?;
    let matches = queried == procedure;
    if !matches {
        warn!(
            order_id = options.order_id,
            query_rows = queried.len(),
            procedure_rows = procedure.len(),
            "Query and stored procedure returned different rows"
        );
    }
    summary.query = Some(queried);
    summary.procedure = Some(procedure);
    summary.query_matches_procedure = Some(matches);

    let name = random_category_name();
    summary.orm = Some(
        run_orm(
            ctx.settings,
            options.order_id,
            options.parent_id,
            &name,
            reporter,
        )
        .await?,
    );

    if incomplete > 0 {
        return Err(AzSqlCtlError::ProvisioningIncomplete { failed: incomplete });
    }
    Ok(())
}

/// `azsqlctl run`
pub async fn handle_run(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    options: RunOptions,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (name, profile) = conn_mgr.profile(profile_name)?;
    let client = conn_mgr.arm_client(profile)?;
    let spec = conn_mgr.provision_spec(profile)?;
    let settings = conn_mgr.connection_settings(profile)?;
    let wait = conn_mgr.wait_options(profile);

    let reporter = Reporter::new(output_format);
    let ctx = RunContext {
        client: &client,
        spec: &spec,
        settings: &settings,
        wait,
        reporter: &reporter,
    };

    let mut summary = RunSummary::new(&name);
    info!(profile = %name, started_at = %summary.started_at, "Run started");

    let outcome = exercise(&ctx, options, &mut summary).await;
    if let Err(e) = &outcome {
        summary.error = Some(e.to_string());
    }

    if options.keep {
        reporter.line(format!(
            "Keeping resource group {} (--keep)",
            spec.resource_group
        ));
    } else {
        match run_deprovision(&client, &spec.resource_group, wait, &reporter).await {
            Ok((_, exists)) => summary.deprovisioned = !exists,
            Err(e) => {
                warn!(resource_group = %spec.resource_group, error = %e, "Teardown failed");
                eprintln!(
                    "{}: failed to delete resource group {}: {}",
                    "warning".yellow().bold(),
                    spec.resource_group,
                    e
                );
            }
        }
    }

    let finished_at = Utc::now();
    summary.finished_at = Some(finished_at);
    info!(
        profile = %name,
        elapsed_secs = (finished_at - summary.started_at).num_seconds(),
        ok = outcome.is_ok(),
        "Run finished"
    );

    reporter.data(&summary)?;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_omits_steps_that_did_not_run() {
        let summary = RunSummary::new("demo");
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["profile"], "demo");
        assert_eq!(value["deprovisioned"], false);
        assert!(value.get("started_at").is_some());
        assert!(value.get("provision").is_none());
        assert!(value.get("orm").is_none());
        assert!(value.get("error").is_none());
    }
}

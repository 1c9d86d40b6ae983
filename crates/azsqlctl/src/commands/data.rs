//! Data commands run against the provisioned database

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use azsqlctl_core::sql::{
    ConnectionSettings, GET_ORDER_PROCEDURE, OrderLine, OrmReport, connect,
    insert_product_category, invoke_get_order, orm_walkthrough, query_order_lines,
};

use crate::cli::OutputFormat;
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::Reporter;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ConnectOutput {
    pub host: String,
    pub database: String,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct InsertOutput {
    pub id: i64,
    pub parent_id: i32,
    pub name: String,
}

/// Name for a product category created by the demo
pub(crate) fn random_category_name() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) async fn run_connect(
    settings: &ConnectionSettings,
    reporter: &Reporter,
) -> CliResult<ConnectOutput> {
    debug!(connection = %settings.redacted_connection_string(), "Connecting");
    let connection = connect(settings).await?;
    let database = connection.database().to_string();
    connection.close().await?;

    reporter.line(format!("Connected to {} on {}", database, settings.host));
    Ok(ConnectOutput {
        host: settings.host.clone(),
        database,
        connected: true,
    })
}

pub(crate) async fn run_insert(
    settings: &ConnectionSettings,
    parent_id: i32,
    name: &str,
    reporter: &Reporter,
) -> CliResult<InsertOutput> {
    let id = insert_product_category(settings, parent_id, name).await?;
    reporter.line(format!("Insert new Product Category with ID: {}", id));
    Ok(InsertOutput {
        id,
        parent_id,
        name: name.to_string(),
    })
}

fn report_lines(reporter: &Reporter, lines: &[OrderLine]) {
    for line in lines {
        reporter.line(line.to_string());
    }
}

pub(crate) async fn run_query(
    settings: &ConnectionSettings,
    order_id: i32,
    reporter: &Reporter,
) -> CliResult<Vec<OrderLine>> {
    let lines = query_order_lines(settings, order_id).await?;
    if lines.is_empty() {
        reporter.line(format!("Order {} has no lines", order_id));
    }
    report_lines(reporter, &lines);
    Ok(lines)
}

pub(crate) async fn run_proc(
    settings: &ConnectionSettings,
    order_id: i32,
    reporter: &Reporter,
) -> CliResult<Vec<OrderLine>> {
    let lines = invoke_get_order(settings, order_id).await?;
    reporter.line(format!(
        "{} returned {} row(s) for order {}",
        GET_ORDER_PROCEDURE,
        lines.len(),
        order_id
    ));
    report_lines(reporter, &lines);
    Ok(lines)
}

pub(crate) async fn run_orm(
    settings: &ConnectionSettings,
    order_id: i32,
    parent_id: i32,
    name: &str,
    reporter: &Reporter,
) -> CliResult<OrmReport> {
    let new_name = random_category_name();
    let report = orm_walkthrough(settings, order_id, parent_id, name, &new_name).await?;

    match &report.order {
        Some(order) => reporter.line(format!(
            "Order Number: {} ({} detail line(s))",
            order.sales_order_id, report.detail_count
        )),
        None => reporter.line(format!("Order Number: {} not found", order_id)),
    }
    for line in &report.lines {
        reporter.line(line.to_string());
    }
    reporter.line(format!("New Product Category ID: {}", report.created_id));
    reporter.line(format!(
        "New Product Category name: {}",
        report.name_after_update
    ));
    reporter.line(format!(
        "Deleted Product Category ID: {}{}",
        report.created_id,
        if report.absent_after_delete {
            ""
        } else {
            " (row still present)"
        }
    ));
    Ok(report)
}

/// `azsqlctl connect`
pub async fn handle_connect(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (_, profile) = conn_mgr.profile(profile_name)?;
    let settings = conn_mgr.connection_settings(profile)?;
    let reporter = Reporter::new(output_format);

    let output = run_connect(&settings, &reporter).await?;
    reporter.data(&output)?;
    Ok(())
}

/// `azsqlctl insert`
pub async fn handle_insert(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    parent_id: i32,
    name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (_, profile) = conn_mgr.profile(profile_name)?;
    let settings = conn_mgr.connection_settings(profile)?;
    let reporter = Reporter::new(output_format);

    let name = name.map_or_else(random_category_name, str::to_string);
    let output = run_insert(&settings, parent_id, &name, &reporter).await?;
    reporter.data(&output)?;
    Ok(())
}

/// `azsqlctl query`
pub async fn handle_query(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    order_id: i32,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (_, profile) = conn_mgr.profile(profile_name)?;
    let settings = conn_mgr.connection_settings(profile)?;
    let reporter = Reporter::new(output_format);

    let lines = run_query(&settings, order_id, &reporter).await?;
    reporter.data(&lines)?;
    Ok(())
}

/// `azsqlctl proc`
pub async fn handle_proc(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    order_id: i32,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (_, profile) = conn_mgr.profile(profile_name)?;
    let settings = conn_mgr.connection_settings(profile)?;
    let reporter = Reporter::new(output_format);

    let lines = run_proc(&settings, order_id, &reporter).await?;
    reporter.data(&lines)?;
    Ok(())
}

/// `azsqlctl orm`
pub async fn handle_orm(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    order_id: i32,
    parent_id: i32,
    name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (_, profile) = conn_mgr.profile(profile_name)?;
    let settings = conn_mgr.connection_settings(profile)?;
    let reporter = Reporter::new(output_format);

    let name = name.map_or_else(random_category_name, str::to_string);
    let report = run_orm(&settings, order_id, parent_id, &name, &reporter).await?;
    reporter.data(&report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_category_names_differ() {
        let a = random_category_name();
        let b = random_category_name();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}

//! End-to-end ORM walkthrough over the mapped sample entities

use serde::Serialize;
use tracing::{debug, info};

use super::connection::ConnectionSettings;
use super::entity::Entity;
use super::models::{OrderDetail, OrderHeader, OrderLineProjection, ProductCategory};
use super::session::Session;
use crate::error::{CoreError, Result};

/// What each step of [`orm_walkthrough`] observed
#[derive(Debug, Clone, Serialize)]
pub struct OrmReport {
    /// Header with its detail lines loaded
    pub order: Option<OrderHeader>,
    pub detail_count: usize,
    pub lines: Vec<OrderLineProjection>,
    pub created_id: i64,
    pub name_after_update: String,
    pub deleted_rows: u64,
    pub absent_after_delete: bool,
}

/// Read an order through the mapped entities, then create, rename and delete
/// a product category
///
/// All steps share one session; its connection is closed before returning.
pub async fn orm_walkthrough(
    settings: &ConnectionSettings,
    order_id: i32,
    parent_id: i32,
    name: &str,
    new_name: &str,
) -> Result<OrmReport> {
    let mut session = Session::open(settings).await?;
    let outcome = walkthrough_on(&mut session, order_id, parent_id, name, new_name).await;
    session.finish(outcome).await
}

async fn walkthrough_on(
    session: &mut Session,
    order_id: i32,
    parent_id: i32,
    name: &str,
    new_name: &str,
) -> Result<OrmReport> {
    let mut order = session.find::<OrderHeader>(order_id).await?;
    let details: Vec<OrderDetail> = session.find_by("SalesOrderID", order_id).await?;
    let detail_count = details.len();
    if let Some(header) = order.as_mut() {
        header.details = details;
    }
    debug!(order_id, found = order.is_some(), detail_count, "Loaded order");

    let lines = session.project::<OrderLineProjection>(order_id).await?;

    let mut category = ProductCategory::new(parent_id, name);
    let created_id = session.insert(&mut category).await?;
    info!(id = created_id, table = ProductCategory::TABLE, "Created row");

    session.update(&category, "Name", new_name).await?;
    let renamed = session
        .find::<ProductCategory>(category.product_category_id)
        .await?
        .ok_or_else(|| CoreError::OperationFailed {
            operation: format!("read back {} {}", ProductCategory::TABLE, created_id),
            message: "row not found after update".to_string(),
        })?;

    let deleted_rows = session.delete(&renamed).await?;
    let absent_after_delete = session
        .find::<ProductCategory>(renamed.product_category_id)
        .await?
        .is_none();
    info!(id = created_id, deleted_rows, absent_after_delete, "Deleted row");

    Ok(OrmReport {
        order,
        detail_count,
        lines,
        created_id,
        name_after_update: renamed.name,
        deleted_rows,
        absent_after_delete,
    })
}

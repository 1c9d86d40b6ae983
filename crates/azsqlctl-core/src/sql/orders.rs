//! Data-access operations against the AdventureWorksLT sample
//!
//! Each public operation opens its own connection and closes it before
//! returning, on success and on error alike.

use std::fmt;

use futures::TryStreamExt;
use serde::Serialize;
use tiberius::{QueryItem, QueryStream, Row};
use tracing::{debug, info};

use super::connection::{ConnectionSettings, SqlConnection, release};
use super::params::NamedParams;
use crate::error::{CoreError, Result};

/// Order present in the AdventureWorksLT sample
pub const SAMPLE_ORDER_ID: i32 = 71797;

/// Stored procedure created and invoked by [`invoke_get_order`]
pub const GET_ORDER_PROCEDURE: &str = "spGetOrder";

const INSERT_CATEGORY: &str = "SET NOCOUNT ON;
INSERT INTO [SalesLT].[ProductCategory] ([ParentProductCategoryID], [Name])
VALUES (@parentid, @name);
SELECT CONVERT(bigint, SCOPE_IDENTITY());";

// Every column is converted server-side so the query and the procedure decode
// the exact same strings.
const ORDER_LINES: &str = "SELECT
    CONVERT(nvarchar(25), SOH.SalesOrderNumber) AS SalesOrderNumber,
    CONVERT(nvarchar(30), SOH.OrderDate, 126) AS OrderDate,
    CONVERT(nvarchar(12), SOH.CustomerID) AS CustomerID,
    CONVERT(nvarchar(12), SOD.ProductID) AS ProductID,
    CONVERT(nvarchar(12), SOD.OrderQty) AS OrderQty,
    CONVERT(nvarchar(30), SOD.UnitPrice) AS UnitPrice
FROM SalesLT.SalesOrderHeader AS SOH
    INNER JOIN SalesLT.SalesOrderDetail AS SOD ON SOH.SalesOrderID = SOD.SalesOrderID
WHERE SOH.SalesOrderID = @orderid
ORDER BY SOD.SalesOrderDetailID";

const DROP_GET_ORDER: &str = "IF OBJECT_ID(N'dbo.spGetOrder', N'P') IS NOT NULL
    DROP PROCEDURE dbo.spGetOrder;";

const INVOKE_GET_ORDER: &str = "EXEC dbo.spGetOrder @orderid;";

fn create_get_order_ddl() -> String {
    format!(
        "CREATE PROCEDURE dbo.spGetOrder @orderid INT
AS
BEGIN
    SET NOCOUNT ON;
    {};
END",
        ORDER_LINES
    )
}

/// One line item of an order, every column as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub sales_order_number: String,
    pub order_date: String,
    pub customer_id: String,
    pub product_id: String,
    pub order_qty: String,
    pub unit_price: String,
}

impl OrderLine {
    pub const COLUMNS: [&'static str; 6] = [
        "SalesOrderNumber",
        "OrderDate",
        "CustomerID",
        "ProductID",
        "OrderQty",
        "UnitPrice",
    ];

    /// Decode the six text columns; a NULL or non-text column is an error
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            sales_order_number: text_column(row, 0)?,
            order_date: text_column(row, 1)?,
            customer_id: text_column(row, 2)?,
            product_id: text_column(row, 3)?,
            order_qty: text_column(row, 4)?,
            unit_price: text_column(row, 5)?,
        })
    }
}

impl fmt::Display for OrderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SalesOrderNumber: {} - OrderDate: {} - CustomerID: {} - ProductID: {} - OrderQty: {} - UnitPrice: {}",
            self.sales_order_number,
            self.order_date,
            self.customer_id,
            self.product_id,
            self.order_qty,
            self.unit_price
        )
    }
}

fn text_column(row: &Row, index: usize) -> Result<String> {
    let column = OrderLine::COLUMNS[index];
    row.try_get::<&str, _>(index)
        .map_err(|e| CoreError::Decode {
            column: column.to_string(),
            message: e.to_string(),
        })?
        .map(str::to_string)
        .ok_or_else(|| CoreError::Decode {
            column: column.to_string(),
            message: "unexpected NULL".to_string(),
        })
}

async fn collect_order_lines(mut stream: QueryStream<'_>) -> Result<Vec<OrderLine>> {
    let mut lines = Vec::new();
    while let Some(item) = stream.try_next().await? {
        if let QueryItem::Row(row) = item {
            lines.push(OrderLine::from_row(&row)?);
        }
    }
    Ok(lines)
}

/// Insert a product category and return its new identifier
///
/// The insert and the identity lookup go to the server as one batch.
pub async fn insert_product_category(
    settings: &ConnectionSettings,
    parent_id: i32,
    name: &str,
) -> Result<i64> {
    let mut connection = SqlConnection::open(settings).await?;
    let outcome = insert_product_category_on(&mut connection, parent_id, name).await;
    release(connection, outcome).await
}

async fn insert_product_category_on(
    connection: &mut SqlConnection,
    parent_id: i32,
    name: &str,
) -> Result<i64> {
    let params = NamedParams::new()
        .bind("parentid", parent_id)
        .bind("name", name);
    let query = params.query(INSERT_CATEGORY)?;

    let results = query
        .query(connection.client())
        .await?
        .into_results()
        .await?;

    let id = results
        .into_iter()
        .rev()
        .find_map(|set| set.into_iter().next())
        .and_then(|row| row.get::<i64, _>(0))
        .ok_or_else(|| CoreError::Decode {
            column: "identity".to_string(),
            message: "no identity value returned".to_string(),
        })?;

    info!(id, parent_id, name = %name, "Inserted product category");
    Ok(id)
}

/// Line items of an order via a parameterized join
pub async fn query_order_lines(settings: &ConnectionSettings, order_id: i32) -> Result<Vec<OrderLine>> {
    let mut connection = SqlConnection::open(settings).await?;
    let outcome = query_order_lines_on(&mut connection, order_id).await;
    release(connection, outcome).await
}

async fn query_order_lines_on(connection: &mut SqlConnection, order_id: i32) -> Result<Vec<OrderLine>> {
    let params = NamedParams::new().bind("orderid", order_id);
    let query = params.query(ORDER_LINES)?;
    let stream = query.query(connection.client()).await?;
    let lines = collect_order_lines(stream).await?;
    debug!(order_id, rows = lines.len(), "Queried order lines");
    Ok(lines)
}

/// Drop `spGetOrder` if it exists and create it again
///
/// Safe to run any number of times in a row.
pub async fn recreate_get_order_procedure(connection: &mut SqlConnection) -> Result<()> {
    connection
        .client()
        .simple_query(DROP_GET_ORDER)
        .await?
        .into_results()
        .await?;

    // CREATE PROCEDURE must be alone in its batch
    connection
        .client()
        .simple_query(create_get_order_ddl())
        .await?
        .into_results()
        .await?;

    debug!(procedure = GET_ORDER_PROCEDURE, "Recreated stored procedure");
    Ok(())
}

/// Recreate `spGetOrder` and return its rows for `order_id`
pub async fn invoke_get_order(settings: &ConnectionSettings, order_id: i32) -> Result<Vec<OrderLine>> {
    let mut connection = SqlConnection::open(settings).await?;
    let outcome = invoke_get_order_on(&mut connection, order_id).await;
    release(connection, outcome).await
}

async fn invoke_get_order_on(connection: &mut SqlConnection, order_id: i32) -> Result<Vec<OrderLine>> {
    recreate_get_order_procedure(connection).await?;

    let params = NamedParams::new().bind("orderid", order_id);
    let query = params.query(INVOKE_GET_ORDER)?;
    let stream = query.query(connection.client()).await?;
    let lines = collect_order_lines(stream).await?;
    debug!(order_id, rows = lines.len(), "Invoked {}", GET_ORDER_PROCEDURE);
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let line = OrderLine {
            sales_order_number: "SO71797".to_string(),
            order_date: "2008-06-01T00:00:00".to_string(),
            customer_id: "29796".to_string(),
            product_id: "822".to_string(),
            order_qty: "1".to_string(),
            unit_price: "356.90".to_string(),
        };
        assert_eq!(
            line.to_string(),
            "SalesOrderNumber: SO71797 - OrderDate: 2008-06-01T00:00:00 - CustomerID: 29796 - ProductID: 822 - OrderQty: 1 - UnitPrice: 356.90"
        );
    }

    #[test]
    fn test_procedure_body_matches_query() {
        let ddl = create_get_order_ddl();
        assert!(ddl.starts_with("CREATE PROCEDURE dbo.spGetOrder @orderid INT"));
        assert!(ddl.contains(ORDER_LINES));
    }

    #[test]
    fn test_statements_use_named_parameters() {
        let insert = NamedParams::new()
            .bind("parentid", 1)
            .bind("name", "x")
            .statement(INSERT_CATEGORY)
            .unwrap();
        assert!(insert.starts_with("DECLARE @parentid INT = @P1;\nDECLARE @name NVARCHAR(MAX) = @P2;"));
        assert!(insert.ends_with("SELECT CONVERT(bigint, SCOPE_IDENTITY());"));

        let invoke = NamedParams::new()
            .bind("orderid", SAMPLE_ORDER_ID)
            .statement(INVOKE_GET_ORDER)
            .unwrap();
        assert_eq!(invoke, "DECLARE @orderid INT = @P1;\nEXEC dbo.spGetOrder @orderid;");
    }
}

//! Mapped entities of the AdventureWorksLT `SalesLT` schema

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use tiberius::Row;

use super::entity::{Column, Entity, Projection, decode_error, int_key, required};
use super::params::SqlValue;
use crate::error::Result;

const ORDER_HEADER_TABLE: &str = "SalesLT.SalesOrderHeader";
const PRODUCT_CATEGORY_TABLE: &str = "SalesLT.ProductCategory";

/// `SalesLT.SalesOrderHeader`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderHeader {
    pub sales_order_id: i32,
    pub order_date: NaiveDateTime,
    pub customer_id: i32,
    /// Loaded separately by foreign key
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<OrderDetail>,
}

impl Entity for OrderHeader {
    const TABLE: &'static str = ORDER_HEADER_TABLE;
    const COLUMNS: &'static [Column] = &[
        Column::new("SalesOrderID").primary_key(),
        Column::new("OrderDate"),
        Column::new("CustomerID"),
    ];

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            sales_order_id: required(row, 0, "SalesOrderID")?,
            order_date: required(row, 1, "OrderDate")?,
            customer_id: required(row, 2, "CustomerID")?,
            details: Vec::new(),
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.sales_order_id.into(),
            self.order_date.into(),
            self.customer_id.into(),
        ]
    }
}

/// `SalesLT.SalesOrderDetail`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    pub sales_order_detail_id: i32,
    pub sales_order_id: i32,
    pub product_id: i32,
    pub order_qty: i16,
    pub unit_price: f64,
}

impl Entity for OrderDetail {
    const TABLE: &'static str = "SalesLT.SalesOrderDetail";
    const COLUMNS: &'static [Column] = &[
        Column::new("SalesOrderDetailID").primary_key().auto_increment(),
        Column::new("SalesOrderID").references(ORDER_HEADER_TABLE, "SalesOrderID"),
        Column::new("ProductID"),
        Column::new("OrderQty"),
        Column::new("UnitPrice"),
    ];

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            sales_order_detail_id: required(row, 0, "SalesOrderDetailID")?,
            sales_order_id: required(row, 1, "SalesOrderID")?,
            product_id: required(row, 2, "ProductID")?,
            order_qty: required(row, 3, "OrderQty")?,
            unit_price: required(row, 4, "UnitPrice")?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.sales_order_detail_id.into(),
            self.sales_order_id.into(),
            self.product_id.into(),
            self.order_qty.into(),
            self.unit_price.into(),
        ]
    }

    fn assign_key(&mut self, key: i64) -> Result<()> {
        self.sales_order_detail_id = int_key::<Self>(key)?;
        Ok(())
    }
}

/// `SalesLT.ProductCategory`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCategory {
    /// Zero until inserted
    pub product_category_id: i32,
    pub parent_product_category_id: Option<i32>,
    pub name: String,
}

impl ProductCategory {
    pub fn new(parent_id: i32, name: impl Into<String>) -> Self {
        Self {
            product_category_id: 0,
            parent_product_category_id: Some(parent_id),
            name: name.into(),
        }
    }
}

impl Entity for ProductCategory {
    const TABLE: &'static str = PRODUCT_CATEGORY_TABLE;
    const COLUMNS: &'static [Column] = &[
        Column::new("ProductCategoryID").primary_key().auto_increment(),
        Column::new("ParentProductCategoryID")
            .references(PRODUCT_CATEGORY_TABLE, "ProductCategoryID"),
        Column::new("Name"),
    ];

    fn from_row(row: &Row) -> Result<Self> {
        let name: &str = required(row, 2, "Name")?;
        Ok(Self {
            product_category_id: required(row, 0, "ProductCategoryID")?,
            parent_product_category_id: row
                .try_get(1)
                .map_err(|e| decode_error("ParentProductCategoryID", e))?,
            name: name.to_string(),
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.product_category_id.into(),
            self.parent_product_category_id.into(),
            self.name.as_str().into(),
        ]
    }

    fn assign_key(&mut self, key: i64) -> Result<()> {
        self.product_category_id = int_key::<Self>(key)?;
        Ok(())
    }
}

/// Order header joined with its detail lines
///
/// Detail columns are NULL for an order without lines (left join).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLineProjection {
    pub sales_order_id: i32,
    pub order_date: NaiveDateTime,
    pub customer_id: i32,
    pub product_id: Option<i32>,
    pub order_qty: Option<i16>,
    pub unit_price: Option<f64>,
}

impl Projection for OrderLineProjection {
    const FROM: &'static str = "SalesLT.SalesOrderHeader \
        LEFT JOIN SalesLT.SalesOrderDetail \
        ON SalesLT.SalesOrderHeader.SalesOrderID = SalesLT.SalesOrderDetail.SalesOrderID";
    const SELECT: &'static [&'static str] = &[
        "SalesLT.SalesOrderHeader.SalesOrderID",
        "SalesLT.SalesOrderHeader.OrderDate",
        "SalesLT.SalesOrderHeader.CustomerID",
        "SalesLT.SalesOrderDetail.ProductID",
        "SalesLT.SalesOrderDetail.OrderQty",
        "SalesLT.SalesOrderDetail.UnitPrice",
    ];
    const FILTER: &'static str = "SalesLT.SalesOrderHeader.SalesOrderID";

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            sales_order_id: required(row, 0, "SalesOrderID")?,
            order_date: required(row, 1, "OrderDate")?,
            customer_id: required(row, 2, "CustomerID")?,
            product_id: row.try_get(3).map_err(|e| decode_error("ProductID", e))?,
            order_qty: row.try_get(4).map_err(|e| decode_error("OrderQty", e))?,
            unit_price: row.try_get(5).map_err(|e| decode_error("UnitPrice", e))?,
        })
    }
}

impl fmt::Display for OrderLineProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SalesOrderNumber: {} - OrderDate: {} - CustomerID: {} - ProductID: {} - OrderQty: {} - UnitPrice: {}",
            self.sales_order_id,
            self.order_date,
            self.customer_id,
            display_opt(self.product_id),
            display_opt(self.order_qty),
            self.unit_price
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

fn display_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

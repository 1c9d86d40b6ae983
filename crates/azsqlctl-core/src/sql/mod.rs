//! SQL access over TDS
//!
//! Connections, named parameters, the sample order operations and a small
//! entity mapping layer with a session for CRUD.

pub mod connection;
pub mod entity;
pub mod models;
pub mod orders;
pub mod orm;
pub mod params;
pub mod session;

pub use connection::{ConnectionSettings, DEFAULT_PORT, SqlConnection, TdsClient, connect};
pub use entity::{Column, Entity, ForeignKey, Projection};
pub use models::{OrderDetail, OrderHeader, OrderLineProjection, ProductCategory};
pub use orders::{
    GET_ORDER_PROCEDURE, OrderLine, SAMPLE_ORDER_ID, insert_product_category, invoke_get_order,
    query_order_lines, recreate_get_order_procedure,
};
pub use orm::{OrmReport, orm_walkthrough};
pub use params::{NamedParams, SqlValue};
pub use session::Session;

//! Azure Resource Manager client
//!
//! Covers the resources needed to stand up a SQL database: resource groups,
//! logical servers, firewall rules and databases.

pub mod auth;
pub mod client;
pub mod error;
pub mod groups;
pub mod operation;
pub mod sql;

pub use auth::{
    CLIENT_ID_ENV, CLIENT_SECRET_ENV, ClientSecretCredential, Credential, DEFAULT_AUTHORITY_URL,
    MANAGEMENT_SCOPE, TENANT_ID_ENV,
};
pub use client::{ArmClient, ArmClientBuilder, ArmResponse, DEFAULT_MANAGEMENT_URL};
pub use error::{ArmError, ErrorBody, Result};
pub use groups::{RESOURCE_GROUPS_API_VERSION, ResourceGroup, ResourceGroupHandler};
pub use operation::{LongRunningOperation, OperationState, PollTarget};
pub use sql::{
    Database, DatabaseHandler, DatabaseProperties, FirewallRule, FirewallRuleHandler,
    FirewallRuleProperties, SQL_API_VERSION, Server, ServerHandler, ServerProperties, Sku,
};

//! # azsqlctl-core
//!
//! Library behind the `azsqlctl` CLI: stand up an Azure SQL database through
//! Azure Resource Manager, then run data operations against it.
//!
//! - [`config`] - profiles, credentials and timeouts
//! - [`arm`] - management client, resource handlers and long-running operations
//! - [`progress`] - waiting on long-running operations with progress callbacks
//! - [`workflows`] - provisioning and teardown as ordered, awaited steps
//! - [`sql`] - TDS connections, parameterized statements and entity mapping
//!
//! ```rust,no_run
//! use azsqlctl_core::arm::{ArmClient, Credential};
//! use azsqlctl_core::{FailurePolicy, ProvisionSpec, WaitOptions, provision};
//!
//! # async fn example() -> azsqlctl_core::Result<()> {
//! let client = ArmClient::builder()
//!     .subscription_id("00000000-0000-0000-0000-000000000000")
//!     .credential(Credential::from_env()?)
//!     .build()?;
//!
//! let spec = ProvisionSpec::new("rg-demo", "westus2", "sql-demo", "AdventureWorksLT")
//!     .with_admin("azureuser", "Secret-123")
//!     .with_sample("AdventureWorksLT");
//!
//! let report = provision(&client, &spec, WaitOptions::default(), FailurePolicy::Abort, None).await?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

pub mod arm;
pub mod config;
pub mod error;
pub mod params;
pub mod progress;
pub mod sql;
pub mod workflows;

pub use error::{CoreError, Result};
pub use params::{DatabaseSpec, FirewallRuleSpec, ProvisionSpec, SERVER_VERSION};
pub use progress::{
    CompletedOperation, ProgressCallback, ProgressEvent, WaitOptions, wait_for_completion,
};
pub use workflows::{
    FailurePolicy, ProvisionReport, ProvisionStep, StepOutcome, StepReport, create_database_and_wait,
    create_firewall_rule_and_wait, create_resource_group, create_server_and_wait, deprovision,
    provision, resource_group_exists,
};

//! Convenience parameters for provisioning
//!
//! [`ProvisionSpec`] collects everything needed to stand up a resource group,
//! logical server, firewall rule and database, and converts into the request
//! bodies the management API expects.

use std::fmt;

use crate::arm::{
    Database, DatabaseProperties, FirewallRule, ResourceGroup, Server, ServerProperties, Sku,
};
use crate::config::{self, Profile};

/// Server version requested for new logical servers
pub const SERVER_VERSION: &str = "12.0";

/// Parameters for a full provisioning run
///
/// # Example
///
/// ```rust
/// use azsqlctl_core::ProvisionSpec;
///
/// let spec = ProvisionSpec::new("azsql-demo", "westeurope", "azsql-demo-srv", "quickstart")
///     .with_admin("sqladmin", "P@ssw0rd!")
///     .with_firewall_rule("my_client_address", "203.0.113.7", "203.0.113.7")
///     .with_sample("AdventureWorksLT");
///
/// let database = spec.database_request();
/// assert_eq!(database.properties.sample_name.as_deref(), Some("AdventureWorksLT"));
/// ```
#[derive(Clone)]
pub struct ProvisionSpec {
    pub resource_group: String,
    pub location: String,
    pub server: String,
    pub admin_login: String,
    pub admin_password: String,
    pub server_version: String,
    /// Skipped when `None`
    pub firewall: Option<FirewallRuleSpec>,
    pub database: DatabaseSpec,
}

/// Firewall rule part of a [`ProvisionSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRuleSpec {
    pub name: String,
    pub start_ip: String,
    pub end_ip: String,
}

/// Database part of a [`ProvisionSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub name: String,
    pub edition: Option<String>,
    pub sample_name: Option<String>,
    pub service_objective: Option<String>,
}

impl fmt::Debug for ProvisionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionSpec")
            .field("resource_group", &self.resource_group)
            .field("location", &self.location)
            .field("server", &self.server)
            .field("admin_login", &self.admin_login)
            .field("admin_password", &"***")
            .field("server_version", &self.server_version)
            .field("firewall", &self.firewall)
            .field("database", &self.database)
            .finish()
    }
}

impl ProvisionSpec {
    /// Create a spec with required names; admin credentials default to empty
    #[must_use]
    pub fn new(
        resource_group: impl Into<String>,
        location: impl Into<String>,
        server: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            location: location.into(),
            server: server.into(),
            admin_login: String::new(),
            admin_password: String::new(),
            server_version: SERVER_VERSION.to_string(),
            firewall: None,
            database: DatabaseSpec {
                name: database.into(),
                edition: None,
                sample_name: None,
                service_objective: None,
            },
        }
    }

    /// Build a spec from a profile, resolving the admin password
    pub fn from_profile(profile: &Profile) -> config::Result<Self> {
        let options = &profile.database_options;
        let mut spec = Self::new(
            &profile.resource_group,
            &profile.location,
            &profile.server,
            &profile.database,
        )
        .with_admin(&profile.admin_login, profile.resolve_admin_password()?)
        .with_firewall_rule(
            &profile.firewall.name,
            &profile.firewall.start_ip,
            &profile.firewall.end_ip,
        )
        .with_edition(&options.edition);

        spec.database.sample_name = options.sample_name.clone();
        spec.database.service_objective = options.service_objective.clone();
        Ok(spec)
    }

    #[must_use]
    pub fn with_admin(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.admin_login = login.into();
        self.admin_password = password.into();
        self
    }

    #[must_use]
    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = version.into();
        self
    }

    #[must_use]
    pub fn with_firewall_rule(
        mut self,
        name: impl Into<String>,
        start_ip: impl Into<String>,
        end_ip: impl Into<String>,
    ) -> Self {
        self.firewall = Some(FirewallRuleSpec {
            name: name.into(),
            start_ip: start_ip.into(),
            end_ip: end_ip.into(),
        });
        self
    }

    #[must_use]
    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.database.edition = Some(edition.into());
        self
    }

    #[must_use]
    pub fn with_sample(mut self, sample_name: impl Into<String>) -> Self {
        self.database.sample_name = Some(sample_name.into());
        self
    }

    #[must_use]
    pub fn with_service_objective(mut self, objective: impl Into<String>) -> Self {
        self.database.service_objective = Some(objective.into());
        self
    }

    pub fn resource_group_request(&self) -> ResourceGroup {
        ResourceGroup::new(&self.location)
    }

    pub fn server_request(&self) -> Server {
        Server {
            location: self.location.clone(),
            properties: ServerProperties {
                administrator_login: Some(self.admin_login.clone()),
                administrator_login_password: Some(self.admin_password.clone()),
                version: Some(self.server_version.clone()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn firewall_request(&self) -> Option<FirewallRule> {
        self.firewall
            .as_ref()
            .map(|rule| FirewallRule::new(&rule.start_ip, &rule.end_ip))
    }

    /// Database body; the edition is only sent alongside a service objective
    pub fn database_request(&self) -> Database {
        let sku = self.database.service_objective.as_ref().map(|name| Sku {
            name: name.clone(),
            tier: self.database.edition.clone(),
        });

        Database {
            location: self.location.clone(),
            sku,
            properties: DatabaseProperties {
                sample_name: self.database.sample_name.clone(),
                status: None,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseOptions, FirewallSettings, TimeoutConfig};
    use pretty_assertions::assert_eq;

    fn profile() -> Profile {
        Profile {
            subscription_id: "sub".to_string(),
            location: "westeurope".to_string(),
            resource_group: "rg".to_string(),
            server: "srv".to_string(),
            admin_login: "sqladmin".to_string(),
            admin_password: "pw".to_string(),
            database: "db".to_string(),
            port: 1433,
            trust_server_certificate: false,
            firewall: FirewallSettings {
                name: "my_client_address".to_string(),
                start_ip: "203.0.113.7".to_string(),
                end_ip: "203.0.113.8".to_string(),
            },
            database_options: DatabaseOptions::default(),
            timeouts: TimeoutConfig::default(),
            endpoints: None,
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_from_profile() {
        let spec = ProvisionSpec::from_profile(&profile()).unwrap();

        assert_eq!(spec.resource_group, "rg");
        assert_eq!(spec.admin_password, "pw");
        assert_eq!(
            spec.firewall,
            Some(FirewallRuleSpec {
                name: "my_client_address".to_string(),
                start_ip: "203.0.113.7".to_string(),
                end_ip: "203.0.113.8".to_string(),
            })
        );
        assert_eq!(
            spec.database,
            DatabaseSpec {
                name: "db".to_string(),
                edition: Some("GeneralPurpose".to_string()),
                sample_name: Some("AdventureWorksLT".to_string()),
                service_objective: Some("GP_Gen5_2".to_string()),
            }
        );
    }

    #[test]
    fn test_requests() {
        let spec = ProvisionSpec::new("rg", "westeurope", "srv", "db")
            .with_admin("sqladmin", "pw")
            .with_edition("GeneralPurpose")
            .with_service_objective("GP_Gen5_2");

        let server = spec.server_request();
        assert_eq!(server.properties.version.as_deref(), Some("12.0"));
        assert_eq!(server.properties.administrator_login.as_deref(), Some("sqladmin"));

        assert!(spec.firewall_request().is_none());

        let database = spec.database_request();
        assert_eq!(
            database.sku,
            Some(Sku {
                name: "GP_Gen5_2".to_string(),
                tier: Some("GeneralPurpose".to_string()),
            })
        );
        assert!(database.properties.sample_name.is_none());
    }

    #[test]
    fn test_database_without_objective_has_no_sku() {
        let spec = ProvisionSpec::new("rg", "westeurope", "srv", "db").with_edition("Basic");
        assert!(spec.database_request().sku.is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let spec = ProvisionSpec::new("rg", "westeurope", "srv", "db").with_admin("sa", "hunter2");
        assert!(!format!("{:?}", spec).contains("hunter2"));
    }
}

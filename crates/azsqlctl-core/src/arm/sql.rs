//! Logical SQL servers, firewall rules and databases (`Microsoft.Sql`)

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::ArmClient;
use super::error::Result;
use super::operation::LongRunningOperation;

pub const SQL_API_VERSION: &str = "2021-11-01";

/// Logical server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Server {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    pub location: String,
    pub properties: ServerProperties,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login: Option<String>,
    /// Write-only; never returned by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing)]
    pub fully_qualified_domain_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub state: Option<String>,
}

impl fmt::Debug for ServerProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerProperties")
            .field("administrator_login", &self.administrator_login)
            .field(
                "administrator_login_password",
                &self.administrator_login_password.as_ref().map(|_| "***"),
            )
            .field("version", &self.version)
            .field("fully_qualified_domain_name", &self.fully_qualified_domain_name)
            .field("state", &self.state)
            .finish()
    }
}

/// Server-level IPv4 firewall rule
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallRule {
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    pub properties: FirewallRuleProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleProperties {
    pub start_ip_address: String,
    pub end_ip_address: String,
}

impl FirewallRule {
    pub fn new(start_ip: impl Into<String>, end_ip: impl Into<String>) -> Self {
        Self {
            name: None,
            properties: FirewallRuleProperties {
                start_ip_address: start_ip.into(),
                end_ip_address: end_ip.into(),
            },
        }
    }
}

/// Database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default)]
    pub properties: DatabaseProperties,
}

/// Service objective (`name`) and edition (`tier`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

fn server_suffix(resource_group: &str, server: &str) -> String {
    format!(
        "resourceGroups/{}/providers/Microsoft.Sql/servers/{}",
        resource_group, server
    )
}

/// Logical server operations
#[derive(Clone)]
pub struct ServerHandler {
    client: ArmClient,
}

impl ServerHandler {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn path(&self, resource_group: &str, server: &str) -> String {
        self.client
            .subscription_path(&server_suffix(resource_group, server))
    }

    /// Start creating (or updating) a server
    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        server: &Server,
    ) -> Result<LongRunningOperation> {
        info!(resource_group = %resource_group, server = %name, "Creating SQL server");
        let path = self.path(resource_group, name);
        let response = self.client.put(&path, SQL_API_VERSION, server).await?;
        Ok(LongRunningOperation::from_response(
            format!("create server {}", name),
            &response,
            Some(&self.client.url(&path, SQL_API_VERSION)),
        ))
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<Server> {
        self.client
            .get(&self.path(resource_group, name), SQL_API_VERSION)
            .await?
            .json()
    }
}

/// Firewall rule operations
#[derive(Clone)]
pub struct FirewallRuleHandler {
    client: ArmClient,
}

impl FirewallRuleHandler {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn path(&self, resource_group: &str, server: &str, rule: &str) -> String {
        self.client.subscription_path(&format!(
            "{}/firewallRules/{}",
            server_suffix(resource_group, server),
            rule
        ))
    }

    /// Start creating (or updating) a firewall rule
    pub async fn create_or_update(
        &self,
        resource_group: &str,
        server: &str,
        name: &str,
        rule: &FirewallRule,
    ) -> Result<LongRunningOperation> {
        info!(
            server = %server,
            rule = %name,
            start_ip = %rule.properties.start_ip_address,
            end_ip = %rule.properties.end_ip_address,
            "Creating firewall rule"
        );
        let path = self.path(resource_group, server, name);
        let response = self.client.put(&path, SQL_API_VERSION, rule).await?;
        Ok(LongRunningOperation::from_response(
            format!("create firewall rule {}", name),
            &response,
            Some(&self.client.url(&path, SQL_API_VERSION)),
        ))
    }

    pub async fn get(&self, resource_group: &str, server: &str, name: &str) -> Result<FirewallRule> {
        self.client
            .get(&self.path(resource_group, server, name), SQL_API_VERSION)
            .await?
            .json()
    }
}

/// Database operations
#[derive(Clone)]
pub struct DatabaseHandler {
    client: ArmClient,
}

impl DatabaseHandler {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn path(&self, resource_group: &str, server: &str, database: &str) -> String {
        self.client.subscription_path(&format!(
            "{}/databases/{}",
            server_suffix(resource_group, server),
            database
        ))
    }

    /// Start creating (or updating) a database
    pub async fn create_or_update(
        &self,
        resource_group: &str,
        server: &str,
        name: &str,
        database: &Database,
    ) -> Result<LongRunningOperation> {
        info!(
            server = %server,
            database = %name,
            sku = ?database.sku.as_ref().map(|s| s.name.as_str()),
            sample = ?database.properties.sample_name,
            "Creating database"
        );
        let path = self.path(resource_group, server, name);
        let response = self.client.put(&path, SQL_API_VERSION, database).await?;
        Ok(LongRunningOperation::from_response(
            format!("create database {}", name),
            &response,
            Some(&self.client.url(&path, SQL_API_VERSION)),
        ))
    }

    pub async fn get(&self, resource_group: &str, server: &str, name: &str) -> Result<Database> {
        self.client
            .get(&self.path(resource_group, server, name), SQL_API_VERSION)
            .await?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_request_body() {
        let server = Server {
            location: "westeurope".to_string(),
            properties: ServerProperties {
                administrator_login: Some("sqladmin".to_string()),
                administrator_login_password: Some("pw".to_string()),
                version: Some("12.0".to_string()),
                fully_qualified_domain_name: Some("never.sent".to_string()),
                state: None,
            },
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&server).unwrap(),
            json!({
                "location": "westeurope",
                "properties": {
                    "administratorLogin": "sqladmin",
                    "administratorLoginPassword": "pw",
                    "version": "12.0"
                }
            })
        );
        assert!(!format!("{:?}", server).contains("\"pw\""));
    }

    #[test]
    fn test_firewall_request_body() {
        let rule = FirewallRule::new("203.0.113.7", "203.0.113.7");
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "properties": {
                    "startIpAddress": "203.0.113.7",
                    "endIpAddress": "203.0.113.7"
                }
            })
        );
    }

    #[test]
    fn test_database_request_body() {
        let database = Database {
            location: "westeurope".to_string(),
            sku: Some(Sku {
                name: "GP_Gen5_2".to_string(),
                tier: Some("GeneralPurpose".to_string()),
            }),
            properties: DatabaseProperties {
                sample_name: Some("AdventureWorksLT".to_string()),
                status: None,
            },
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&database).unwrap(),
            json!({
                "location": "westeurope",
                "sku": { "name": "GP_Gen5_2", "tier": "GeneralPurpose" },
                "properties": { "sampleName": "AdventureWorksLT" }
            })
        );
    }

    #[test]
    fn test_server_response_deserialization() {
        let body = r#"{
            "name": "srv",
            "location": "westeurope",
            "properties": {
                "administratorLogin": "sqladmin",
                "version": "12.0",
                "state": "Ready",
                "fullyQualifiedDomainName": "srv.database.windows.net"
            }
        }"#;
        let server: Server = serde_json::from_str(body).unwrap();
        assert_eq!(
            server.properties.fully_qualified_domain_name.as_deref(),
            Some("srv.database.windows.net")
        );
        assert!(server.properties.administrator_login_password.is_none());
    }
}

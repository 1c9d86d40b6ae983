//! Resource groups

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::ArmClient;
use super::error::Result;
use super::operation::LongRunningOperation;

pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";

/// Resource group as sent to and returned by the service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceGroup {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing)]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

impl ResourceGroup {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }
}

/// Resource group operations
#[derive(Clone)]
pub struct ResourceGroupHandler {
    client: ArmClient,
}

impl ResourceGroupHandler {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .subscription_path(&format!("resourcegroups/{}", name))
    }

    /// Create or update a resource group; completes synchronously
    pub async fn create_or_update(&self, name: &str, group: &ResourceGroup) -> Result<ResourceGroup> {
        info!(resource_group = %name, location = %group.location, "Creating resource group");
        let response = self
            .client
            .put(&self.path(name), RESOURCE_GROUPS_API_VERSION, group)
            .await?;
        response.json()
    }

    pub async fn get(&self, name: &str) -> Result<ResourceGroup> {
        self.client
            .get(&self.path(name), RESOURCE_GROUPS_API_VERSION)
            .await?
            .json()
    }

    /// Whether the group exists; a 404 is `Ok(false)`
    pub async fn exists(&self, name: &str) -> Result<bool> {
        match self.get(name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Start deleting the group and everything in it
    pub async fn delete(&self, name: &str) -> Result<LongRunningOperation> {
        info!(resource_group = %name, "Deleting resource group");
        let response = self
            .client
            .delete(&self.path(name), RESOURCE_GROUPS_API_VERSION)
            .await?;
        Ok(LongRunningOperation::from_response(
            format!("delete resource group {}", name),
            &response,
            None,
        ))
    }
}

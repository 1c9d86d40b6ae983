//! Building management clients and database settings from the active profile

use crate::error::Result as CliResult;
use anyhow::Context;
use azsqlctl_core::arm::{ArmClient, Credential};
use azsqlctl_core::config::{Config, Profile};
use azsqlctl_core::sql::ConnectionSettings;
use azsqlctl_core::{ProvisionSpec, WaitOptions};
use tracing::{debug, info};

/// User agent string for azsqlctl HTTP requests
const AZSQLCTL_USER_AGENT: &str = concat!("azsqlctl/", env!("CARGO_PKG_VERSION"));

/// Resolves profiles and turns them into clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<std::path::PathBuf>,
}

impl ConnectionManager {
    /// Create a connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<std::path::PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Path the configuration is read from and saved to
    pub fn config_file(&self) -> CliResult<std::path::PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> CliResult<()> {
        if let Some(ref path) = self.config_path {
            self.config
                .save_to_path(path)
                .context("Failed to save configuration")?;
        } else {
            self.config.save().context("Failed to save configuration")?;
        }
        Ok(())
    }

    /// Resolve and validate the profile to work with
    pub fn profile(&self, explicit: Option<&str>) -> CliResult<(String, &Profile)> {
        let (name, profile) = self.config.profile(explicit)?;
        profile.validate(&name)?;
        debug!("Using profile '{}'", name);
        Ok((name, profile))
    }

    /// Management client authenticated with the service principal in the environment
    pub fn arm_client(&self, profile: &Profile) -> CliResult<ArmClient> {
        let subscription_id = profile.resolve_subscription_id()?;
        let endpoints = profile.endpoints.clone().unwrap_or_default();

        let credential = match Credential::from_env()? {
            Credential::ClientSecret(secret) => match endpoints.authority_url {
                Some(authority) => {
                    debug!("Using authority override {}", authority);
                    Credential::ClientSecret(secret.with_authority(authority))
                }
                None => Credential::ClientSecret(secret),
            },
            other => other,
        };

        let mut builder = ArmClient::builder()
            .subscription_id(subscription_id)
            .credential(credential)
            .user_agent(AZSQLCTL_USER_AGENT);
        if let Some(url) = endpoints.management_url {
            info!("Using management endpoint {}", url);
            builder = builder.base_url(url);
        }

        Ok(builder.build().map_err(azsqlctl_core::CoreError::from)?)
    }

    /// What to create, with the admin password resolved
    pub fn provision_spec(&self, profile: &Profile) -> CliResult<ProvisionSpec> {
        Ok(ProvisionSpec::from_profile(profile)?)
    }

    /// Database connection settings, with the admin password resolved
    pub fn connection_settings(&self, profile: &Profile) -> CliResult<ConnectionSettings> {
        Ok(ConnectionSettings::from_profile(profile)?)
    }

    /// Polling bounds for long-running operations
    pub fn wait_options(&self, profile: &Profile) -> WaitOptions {
        WaitOptions::from(&profile.timeouts)
    }
}

//! Configuration management for azsqlctl
//!
//! Handles configuration loading from files, environment variables, and command-line arguments.
//! Configuration is stored in TOML format with support for multiple named profiles, each
//! describing one deployment: where the resources live, what they are called, and how to
//! log in to the database once it exists.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::CredentialStore;
use super::error::{ConfigError, Result};
use super::timeouts::TimeoutConfig;

/// Environment variable overriding a profile's subscription id
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Environment variable overriding a profile's SQL admin password
pub const ADMIN_PASSWORD_ENV: &str = "AZSQLCTL_ADMIN_PASSWORD";

/// DNS suffix of logical servers in the public cloud
pub const SERVER_DNS_SUFFIX: &str = "database.windows.net";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Profile {
    /// Subscription that owns the resource group
    pub subscription_id: String,
    /// Region for every created resource (e.g. "westeurope")
    pub location: String,
    /// Resource group created before, and deleted after, everything else
    pub resource_group: String,
    /// Logical server name; a name containing a dot is used as a host name as-is
    pub server: String,
    /// SQL administrator login
    pub admin_login: String,
    /// SQL administrator password. Supports the keyring: prefix.
    pub admin_password: String,
    /// Database name
    pub database: String,
    /// TDS port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Accept any server certificate (local SQL Server with a self-signed cert)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub trust_server_certificate: bool,
    /// Firewall rule opened for the client running the demo
    pub firewall: FirewallSettings,
    /// Edition, sample and service objective of the database
    #[serde(default)]
    pub database_options: DatabaseOptions,
    /// Operation and connection timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Alternative management and identity endpoints (sovereign clouds, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<EndpointOverrides>,
}

/// Firewall rule settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FirewallSettings {
    #[serde(default = "default_firewall_rule_name")]
    pub name: String,
    pub start_ip: String,
    pub end_ip: String,
}

/// Database creation options
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    #[serde(default = "default_edition")]
    pub edition: String,
    /// Sample dataset to seed the database from; the demo queries need AdventureWorksLT
    #[serde(default = "default_sample_name")]
    pub sample_name: Option<String>,
    #[serde(default = "default_service_objective")]
    pub service_objective: Option<String>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            edition: default_edition(),
            sample_name: default_sample_name(),
            service_objective: default_service_objective(),
        }
    }
}

/// Endpoint overrides
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_url: Option<String>,
}

fn default_port() -> u16 {
    1433
}

fn default_firewall_rule_name() -> String {
    "my_client_address".to_string()
}

fn default_edition() -> String {
    "GeneralPurpose".to_string()
}

fn default_sample_name() -> Option<String> {
    Some("AdventureWorksLT".to_string())
}

fn default_service_objective() -> Option<String> {
    Some("GP_Gen5_2".to_string())
}

impl Profile {
    /// Host name clients connect to
    pub fn server_fqdn(&self) -> String {
        if self.server.contains('.') {
            self.server.clone()
        } else {
            format!("{}.{}", self.server, SERVER_DNS_SUFFIX)
        }
    }

    /// Subscription id with environment variable override
    pub fn resolve_subscription_id(&self) -> Result<String> {
        CredentialStore::new()
            .get_credential(&self.subscription_id, Some(SUBSCRIPTION_ENV))
            .map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve subscription id: {}", e))
            })
    }

    /// Admin password with keyring and environment variable support
    pub fn resolve_admin_password(&self) -> Result<String> {
        CredentialStore::new()
            .get_credential(&self.admin_password, Some(ADMIN_PASSWORD_ENV))
            .map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve admin password: {}", e))
            })
    }

    /// Check that every required field is filled in
    pub fn validate(&self, name: &str) -> Result<()> {
        let required = [
            ("subscription_id", &self.subscription_id),
            ("location", &self.location),
            ("resource_group", &self.resource_group),
            ("server", &self.server),
            ("admin_login", &self.admin_login),
            ("admin_password", &self.admin_password),
            ("database", &self.database),
            ("firewall.start_ip", &self.firewall.start_ip),
            ("firewall.end_ip", &self.firewall.end_ip),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    profile: name.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Config {
    /// Resolve the profile name to use
    ///
    /// Resolution order: explicit name, `default_profile`, then the first profile
    /// alphabetically.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| (*name).clone())
            .ok_or_else(|| ConfigError::NoProfiles {
                suggestion: format!(
                    "Add a [profiles.<name>] section to {}",
                    Self::config_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|_| "the config file".to_string())
                ),
            })
    }

    /// Resolve and fetch a profile in one step
    pub fn profile(&self, explicit_profile: Option<&str>) -> Result<(String, &Profile)> {
        let name = self.resolve_profile(explicit_profile)?;
        let profile = self
            .profiles
            .get(&name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.clone() })?;
        Ok((name, profile))
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, `~/.config/azsqlctl/config.toml` is preferred when it (or its
    /// directory) exists, falling back to the platform location.
    ///
    /// On Linux: ~/.config/azsqlctl/config.toml
    /// On Windows: %APPDATA%\azsqlctl\azsqlctl\config\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("azsqlctl")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path
                        .parent()
                        .map(|p| p.exists())
                        .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "azsqlctl", "azsqlctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports `${VAR}` and `${VAR:-default}`. Unset variables without a default are
    /// left as-is so that unused profiles do not break loading.
    ///
    /// ```toml
    /// subscription_id = "${AZURE_SUBSCRIPTION_ID}"
    /// location = "${AZSQL_LOCATION:-westeurope}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn make_profile() -> Profile {
        Profile {
            subscription_id: "00000000-0000-0000-0000-000000000000".to_string(),
            location: "westeurope".to_string(),
            resource_group: "azsql-demo".to_string(),
            server: "azsql-demo-srv".to_string(),
            admin_login: "sqladmin".to_string(),
            admin_password: "P@ssw0rd!".to_string(),
            database: "quickstart".to_string(),
            port: 1433,
            trust_server_certificate: false,
            firewall: FirewallSettings {
                name: "my_client_address".to_string(),
                start_ip: "203.0.113.7".to_string(),
                end_ip: "203.0.113.7".to_string(),
            },
            database_options: DatabaseOptions::default(),
            timeouts: TimeoutConfig::default(),
            endpoints: None,
        }
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile("demo".to_string(), make_profile());
        config.default_profile = Some("demo".to_string());

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.default_profile, deserialized.default_profile);
        assert_eq!(config.profiles.len(), deserialized.profiles.len());
        let profile = &deserialized.profiles["demo"];
        assert_eq!(profile.firewall.start_ip, "203.0.113.7");
        assert_eq!(profile.database_options, DatabaseOptions::default());
    }

    #[test]
    fn test_minimal_profile_defaults() {
        let content = r#"
[profiles.demo]
subscription_id = "sub"
location = "westeurope"
resource_group = "rg"
server = "srv"
admin_login = "sqladmin"
admin_password = "pw"
database = "db"

[profiles.demo.firewall]
start_ip = "198.51.100.1"
end_ip = "198.51.100.1"
"#;
        let config: Config = toml::from_str(content).unwrap();
        let profile = &config.profiles["demo"];

        assert_eq!(profile.port, 1433);
        assert!(!profile.trust_server_certificate);
        assert_eq!(profile.firewall.name, "my_client_address");
        assert_eq!(profile.database_options.edition, "GeneralPurpose");
        assert_eq!(
            profile.database_options.sample_name.as_deref(),
            Some("AdventureWorksLT")
        );
        assert_eq!(
            profile.database_options.service_objective.as_deref(),
            Some("GP_Gen5_2")
        );
        assert_eq!(profile.timeouts, TimeoutConfig::default());
        assert!(profile.endpoints.is_none());
    }

    #[test]
    fn test_server_fqdn() {
        let mut profile = make_profile();
        assert_eq!(profile.server_fqdn(), "azsql-demo-srv.database.windows.net");

        profile.server = "localhost.localdomain".to_string();
        assert_eq!(profile.server_fqdn(), "localhost.localdomain");
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let mut profile = make_profile();
        assert!(profile.validate("demo").is_ok());

        profile.admin_login = "  ".to_string();
        let err = profile.validate("demo").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { ref field, .. } if field == "admin_login"
        ));
    }

    #[test]
    fn test_profile_resolution() {
        let mut config = Config::default();
        config.set_profile("zeta".to_string(), make_profile());
        config.set_profile("alpha".to_string(), make_profile());

        // First alphabetically when nothing else is set
        assert_eq!(config.resolve_profile(None).unwrap(), "alpha");

        config.default_profile = Some("zeta".to_string());
        assert_eq!(config.resolve_profile(None).unwrap(), "zeta");

        // Explicit always wins
        assert_eq!(config.resolve_profile(Some("other")).unwrap(), "other");
        assert!(matches!(
            config.profile(Some("other")),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_no_profile_errors() {
        let config = Config::default();
        let err = config.resolve_profile(None).unwrap_err();
        assert!(matches!(err, ConfigError::NoProfiles { .. }));
    }

    #[test]
    fn test_remove_default_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("demo".to_string(), make_profile());
        config.default_profile = Some("demo".to_string());

        assert!(config.remove_profile("demo").is_some());
        assert!(config.default_profile.is_none());
        assert!(config.profiles.is_empty());
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion() {
        unsafe {
            std::env::set_var("AZSQLCTL_TEST_SUB", "sub-from-env");
        }

        let content = r#"
[profiles.demo]
subscription_id = "${AZSQLCTL_TEST_SUB}"
location = "${AZSQLCTL_TEST_MISSING:-northeurope}"
"#;

        let expanded = Config::expand_env_vars(content);
        assert!(expanded.contains("sub-from-env"));
        assert!(expanded.contains("northeurope"));

        unsafe {
            std::env::remove_var("AZSQLCTL_TEST_SUB");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_admin_password_env_override() {
        let profile = make_profile();

        unsafe {
            std::env::set_var(ADMIN_PASSWORD_ENV, "from-env");
        }
        assert_eq!(profile.resolve_admin_password().unwrap(), "from-env");

        unsafe {
            std::env::remove_var(ADMIN_PASSWORD_ENV);
        }
        assert_eq!(profile.resolve_admin_password().unwrap(), "P@ssw0rd!");
    }
}

//! Profile management command implementations

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::AzSqlCtlError;
use crate::output;
use azsqlctl_core::config::{ConfigError, CredentialStore, Profile};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, trace};

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    explicit_profile: Option<&str>,
    output_format: OutputFormat,
) -> Result<(), AzSqlCtlError> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => {
            handle_show(conn_mgr, name.as_deref().or(explicit_profile), output_format)
        }
        Validate => handle_validate(conn_mgr, output_format),
        Remove { name } => handle_remove(conn_mgr, name),
        Default { name } => handle_default(conn_mgr, name),
    }
}

/// Profile as shown to the user, secrets masked
#[derive(Debug, Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    is_default: bool,
    subscription_id: &'a str,
    location: &'a str,
    resource_group: &'a str,
    server: String,
    database: &'a str,
    admin_login: &'a str,
    admin_password: String,
    firewall_rule: String,
    edition: &'a str,
    sample: Option<&'a str>,
    service_objective: Option<&'a str>,
    operation_timeout_secs: u64,
}

impl<'a> ProfileView<'a> {
    fn new(name: &'a str, profile: &'a Profile, is_default: bool) -> Self {
        Self {
            name,
            is_default,
            subscription_id: &profile.subscription_id,
            location: &profile.location,
            resource_group: &profile.resource_group,
            server: format!("{}:{}", profile.server_fqdn(), profile.port),
            database: &profile.database,
            admin_login: &profile.admin_login,
            admin_password: mask_secret(&profile.admin_password),
            firewall_rule: format!(
                "{} ({} - {})",
                profile.firewall.name, profile.firewall.start_ip, profile.firewall.end_ip
            ),
            edition: &profile.database_options.edition,
            sample: profile.database_options.sample_name.as_deref(),
            service_objective: profile.database_options.service_objective.as_deref(),
            operation_timeout_secs: profile.timeouts.operation_timeout_secs,
        }
    }
}

/// Keyring references are safe to show; anything else is masked
fn mask_secret(value: &str) -> String {
    if CredentialStore::is_keyring_reference(value) || value.is_empty() {
        value.to_string()
    } else {
        "***".to_string()
    }
}

fn handle_list(
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> Result<(), AzSqlCtlError> {
    debug!("Listing all configured profiles");
    let profiles = conn_mgr.config.list_profiles();
    trace!("Found {} profiles", profiles.len());

    let default = conn_mgr.config.default_profile.as_deref();
    let views: Vec<ProfileView<'_>> = profiles
        .iter()
        .map(|(name, profile)| ProfileView::new(name, profile, default == Some(name.as_str())))
        .collect();

    match output::OutputFormat::structured(output_format) {
        Some(fmt) => output::print_output(&views, fmt)?,
        None => {
            if views.is_empty() {
                println!("No profiles configured.");
                println!("Add a [profiles.<name>] section to {}", conn_mgr.config_file()?.display());
                return Ok(());
            }
            for view in &views {
                let marker = if view.is_default { "*".green().to_string() } else { " ".to_string() };
                println!(
                    "{} {:<16} {:<14} {}/{}",
                    marker, view.name, view.location, view.server, view.database
                );
            }
        }
    }
    Ok(())
}

fn handle_path(
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> Result<(), AzSqlCtlError> {
    let config_path = conn_mgr.config_file()?;

    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let output_data = serde_json::json!({
                "config_path": config_path.to_str()
            });

            let fmt = match output_format {
                OutputFormat::Yaml => output::OutputFormat::Yaml,
                _ => output::OutputFormat::Json,
            };

            output::print_output(&output_data, fmt)?;
        }
        _ => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: Option<&str>,
    output_format: OutputFormat,
) -> Result<(), AzSqlCtlError> {
    let (name, profile) = conn_mgr.config.profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name.as_str());
    let view = ProfileView::new(&name, profile, is_default);

    match output::OutputFormat::structured(output_format) {
        Some(fmt) => output::print_output(&view, fmt)?,
        None => {
            println!("Profile: {}{}", view.name, if is_default { " (default)" } else { "" });
            println!("  Subscription:      {}", view.subscription_id);
            println!("  Location:          {}", view.location);
            println!("  Resource group:    {}", view.resource_group);
            println!("  Server:            {}", view.server);
            println!("  Database:          {}", view.database);
            println!("  Admin login:       {}", view.admin_login);
            println!("  Admin password:    {}", view.admin_password);
            println!("  Firewall rule:     {}", view.firewall_rule);
            println!("  Edition:           {}", view.edition);
            println!("  Sample:            {}", view.sample.unwrap_or("-"));
            println!("  Service objective: {}", view.service_objective.unwrap_or("-"));
        }
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> Result<(), AzSqlCtlError> {
    debug!("Removing profile: {}", name);

    if !conn_mgr.config.profiles.contains_key(name) {
        return Err(AzSqlCtlError::ProfileNotFound { name: name.into() });
    }

    let mut conn_mgr = conn_mgr.clone();
    let was_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    conn_mgr.config.remove_profile(name);
    conn_mgr.save_config()?;

    println!("Profile '{}' removed.", name);
    if was_default {
        println!("Default profile cleared.");
    }
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> Result<(), AzSqlCtlError> {
    debug!("Setting default profile: {}", name);

    if !conn_mgr.config.profiles.contains_key(name) {
        return Err(AzSqlCtlError::ProfileNotFound { name: name.into() });
    }

    let mut conn_mgr = conn_mgr.clone();
    conn_mgr.config.default_profile = Some(name.to_string());
    conn_mgr.save_config()?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    config_path: String,
    config_exists: bool,
    profile_count: usize,
    profiles: Vec<ProfileValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_profile: Option<DefaultValidation>,
    overall_valid: bool,
}

#[derive(Debug, Serialize)]
struct ProfileValidation {
    name: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_field: Option<String>,
}

#[derive(Debug, Serialize)]
struct DefaultValidation {
    name: String,
    valid: bool,
}

fn validate_profile(name: &str, profile: &Profile) -> ProfileValidation {
    match profile.validate(name) {
        Ok(()) => ProfileValidation {
            name: name.to_string(),
            valid: true,
            missing_field: None,
        },
        Err(ConfigError::MissingField { field, .. }) => ProfileValidation {
            name: name.to_string(),
            valid: false,
            missing_field: Some(field),
        },
        Err(_) => ProfileValidation {
            name: name.to_string(),
            valid: false,
            missing_field: None,
        },
    }
}

fn handle_validate(
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> Result<(), AzSqlCtlError> {
    let config_path = conn_mgr.config_file()?;
    debug!("Validating configuration at {}", config_path.display());

    let profiles: Vec<ProfileValidation> = conn_mgr
        .config
        .list_profiles()
        .into_iter()
        .map(|(name, profile)| validate_profile(name, profile))
        .collect();

    let default_profile = conn_mgr
        .config
        .default_profile
        .as_ref()
        .map(|name| DefaultValidation {
            name: name.clone(),
            valid: conn_mgr.config.profiles.contains_key(name),
        });

    let config_exists = config_path.exists();
    let overall_valid = config_exists
        && !profiles.is_empty()
        && profiles.iter().all(|p| p.valid)
        && default_profile.as_ref().is_none_or(|d| d.valid);

    let result = ValidationOutput {
        config_path: config_path.display().to_string(),
        config_exists,
        profile_count: profiles.len(),
        profiles,
        default_profile,
        overall_valid,
    };

    match output::OutputFormat::structured(output_format) {
        Some(fmt) => output::print_output(&result, fmt)?,
        None => print_validation_human(&result),
    }
    Ok(())
}

fn print_validation_human(result: &ValidationOutput) {
    println!("Configuration file: {}", result.config_path);

    if !result.config_exists {
        println!("{} Configuration file does not exist", "x".red());
        return;
    }

    println!("{} Found {} profile(s)", "ok".green(), result.profile_count);
    if result.profiles.is_empty() {
        println!("{} No profiles configured", "!!".yellow());
        return;
    }

    for p in &result.profiles {
        match (&p.valid, &p.missing_field) {
            (true, _) => println!("{} Profile '{}'", "ok".green(), p.name),
            (false, Some(field)) => {
                println!("{} Profile '{}': missing '{}'", "x".red(), p.name, field)
            }
            (false, None) => println!("{} Profile '{}'", "x".red(), p.name),
        }
    }

    if let Some(default) = &result.default_profile
        && !default.valid
    {
        println!(
            "{} Default profile '{}' does not exist",
            "x".red(),
            default.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("P@ssw0rd!"), "***");
        assert_eq!(mask_secret("keyring:demo-admin"), "keyring:demo-admin");
        assert_eq!(mask_secret(""), "");
    }
}

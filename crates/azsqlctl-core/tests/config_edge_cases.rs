use std::fs;
use std::path::PathBuf;

use azsqlctl_core::config::{Config, ConfigError};
use azsqlctl_core::sql::ConnectionSettings;
use azsqlctl_core::{ProvisionSpec, WaitOptions};
use serial_test::serial;
use tempfile::TempDir;

/// Returns true if running as root (euid == 0). Used to skip permission tests.
#[cfg(unix)]
fn is_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim() == "0")
        .unwrap_or(false)
}

const MINIMAL_PROFILE: &str = r#"
[profiles.demo]
subscription_id = "00000000-0000-0000-0000-000000000000"
location = "westeurope"
resource_group = "azsql-demo"
server = "azsql-demo-srv"
admin_login = "sqladmin"
admin_password = "P@ssw0rd!"
database = "quickstart"

[profiles.demo.firewall]
start_ip = "203.0.113.7"
end_ip = "203.0.113.7"
"#;

fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, content).unwrap();
    (dir, config_path)
}

// ---------------------------------------------------------------------------
// Missing, empty and corrupt files
// ---------------------------------------------------------------------------

#[test]
fn load_from_nonexistent_path_returns_default_config() {
    let path = PathBuf::from("/tmp/azsqlctl-test-nonexistent/does/not/exist/config.toml");
    assert!(!path.exists());

    let config = Config::load_from_path(&path).expect("missing file should load as default");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

#[test]
fn load_empty_config_file_returns_default_config() {
    let (_dir, config_path) = write_config("");

    let config = Config::load_from_path(&config_path).expect("empty file should parse as default");

    assert!(config.profiles.is_empty());
    assert!(matches!(
        config.resolve_profile(None),
        Err(ConfigError::NoProfiles { .. })
    ));
}

#[test]
fn load_corrupt_toml_returns_parse_error() {
    let (_dir, config_path) = write_config("[[[broken");

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
    assert!(err.to_string().contains("parse"));
}

#[test]
fn load_profile_missing_required_fields_returns_error() {
    let (_dir, config_path) = write_config(
        r#"
[profiles.broken]
location = "westeurope"
"#,
    );

    assert!(Config::load_from_path(&config_path).is_err());
}

// ---------------------------------------------------------------------------
// Defaults, unknown fields and validation
// ---------------------------------------------------------------------------

#[test]
fn minimal_profile_gets_defaults() {
    let (_dir, config_path) = write_config(MINIMAL_PROFILE);

    let config = Config::load_from_path(&config_path).unwrap();
    let (name, profile) = config.profile(None).unwrap();

    assert_eq!(name, "demo");
    assert_eq!(profile.port, 1433);
    assert!(!profile.trust_server_certificate);
    assert_eq!(profile.firewall.name, "my_client_address");
    assert_eq!(profile.database_options.edition, "GeneralPurpose");
    assert_eq!(
        profile.database_options.sample_name.as_deref(),
        Some("AdventureWorksLT")
    );
    assert_eq!(profile.server_fqdn(), "azsql-demo-srv.database.windows.net");
    assert!(profile.validate(&name).is_ok());

    let wait = WaitOptions::from(&profile.timeouts);
    assert_eq!(wait.timeout.as_secs(), 1800);
}

#[test]
fn load_config_with_unknown_fields_ignores_them() {
    let content = format!(
        "unknown_top_level_key = \"hello\"\n{}\ntotally_unknown_field = true\n",
        MINIMAL_PROFILE
    );
    let (_dir, config_path) = write_config(&content);

    let config =
        Config::load_from_path(&config_path).expect("unknown fields should be silently ignored");

    assert!(config.profiles.contains_key("demo"));
}

#[test]
fn validate_names_first_empty_field() {
    let content = MINIMAL_PROFILE.replace("admin_login = \"sqladmin\"", "admin_login = \"  \"");
    let (_dir, config_path) = write_config(&content);

    let config = Config::load_from_path(&config_path).unwrap();
    let err = config.profiles["demo"].validate("demo").unwrap_err();

    assert!(matches!(
        err,
        ConfigError::MissingField { ref profile, ref field }
            if profile == "demo" && field == "admin_login"
    ));
}

#[test]
fn explicit_unknown_profile_is_not_found() {
    let (_dir, config_path) = write_config(MINIMAL_PROFILE);
    let config = Config::load_from_path(&config_path).unwrap();

    assert!(matches!(
        config.profile(Some("prod")),
        Err(ConfigError::ProfileNotFound { ref name }) if name == "prod"
    ));
}

// ---------------------------------------------------------------------------
// Environment expansion and overrides
// ---------------------------------------------------------------------------

#[test]
#[serial]
fn env_vars_are_expanded_with_defaults() {
    let content = MINIMAL_PROFILE
        .replace("\"westeurope\"", "\"${AZSQLCTL_TEST_LOCATION:-northeurope}\"")
        .replace("\"azsql-demo\"", "\"${AZSQLCTL_TEST_GROUP}\"");
    let (_dir, config_path) = write_config(&content);

    unsafe {
        std::env::remove_var("AZSQLCTL_TEST_LOCATION");
        std::env::set_var("AZSQLCTL_TEST_GROUP", "rg-from-env");
    }
    let config = Config::load_from_path(&config_path).unwrap();
    unsafe {
        std::env::remove_var("AZSQLCTL_TEST_GROUP");
    }

    let profile = &config.profiles["demo"];
    assert_eq!(profile.location, "northeurope");
    assert_eq!(profile.resource_group, "rg-from-env");
}

#[test]
#[serial]
fn admin_password_env_override_reaches_spec_and_settings() {
    let (_dir, config_path) = write_config(MINIMAL_PROFILE);
    let config = Config::load_from_path(&config_path).unwrap();
    let profile = &config.profiles["demo"];

    unsafe {
        std::env::set_var("AZSQLCTL_ADMIN_PASSWORD", "from-env");
    }
    let spec = ProvisionSpec::from_profile(profile);
    let settings = ConnectionSettings::from_profile(profile);
    unsafe {
        std::env::remove_var("AZSQLCTL_ADMIN_PASSWORD");
    }

    let spec = spec.unwrap();
    assert_eq!(spec.admin_password, "from-env");
    assert!(!format!("{:?}", spec).contains("from-env"));

    let settings = settings.unwrap();
    assert_eq!(settings.host, "azsql-demo-srv.database.windows.net");
    assert!(settings.connection_string().contains("password=from-env;"));
    assert!(!format!("{:?}", settings).contains("from-env"));
}

#[cfg(not(feature = "secure-storage"))]
#[test]
#[serial]
fn keyring_reference_without_feature_is_credential_error() {
    let content = MINIMAL_PROFILE.replace("\"P@ssw0rd!\"", "\"keyring:demo-admin\"");
    let (_dir, config_path) = write_config(&content);
    let config = Config::load_from_path(&config_path).unwrap();

    unsafe {
        std::env::remove_var("AZSQLCTL_ADMIN_PASSWORD");
    }
    let err = config.profiles["demo"].resolve_admin_password().unwrap_err();
    assert!(matches!(err, ConfigError::CredentialError(_)));
}

// ---------------------------------------------------------------------------
// Round trip and permissions
// ---------------------------------------------------------------------------

#[test]
fn save_and_reload_preserves_profiles() {
    let (dir, config_path) = write_config(MINIMAL_PROFILE);
    let mut config = Config::load_from_path(&config_path).unwrap();
    let mut second = config.profiles["demo"].clone();
    second.location = "eastus".to_string();
    config.set_profile("east".to_string(), second);
    config.default_profile = Some("east".to_string());

    let saved_path = dir.path().join("nested").join("config.toml");
    config.save_to_path(&saved_path).unwrap();
    let reloaded = Config::load_from_path(&saved_path).unwrap();

    assert_eq!(reloaded.list_profiles().len(), 2);
    let (name, profile) = reloaded.profile(None).unwrap();
    assert_eq!(name, "east");
    assert_eq!(profile.location, "eastus");

    let mut reloaded = reloaded;
    assert!(reloaded.remove_profile("east").is_some());
    assert!(reloaded.default_profile.is_none());
}

#[cfg(unix)]
#[test]
fn load_unreadable_file_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let (_dir, config_path) = write_config("# valid toml");
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o000)).unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::LoadError { .. }));

    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn save_to_readonly_directory_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let readonly_dir = dir.path().join("readonly");
    fs::create_dir(&readonly_dir).unwrap();
    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o444)).unwrap();

    let err = Config::default()
        .save_to_path(&readonly_dir.join("config.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::SaveError { .. }));

    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o755)).unwrap();
}

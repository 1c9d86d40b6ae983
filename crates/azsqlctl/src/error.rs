//! Error types for azsqlctl
//!
//! Library errors are mapped into [`AzSqlCtlError`], which knows how to
//! suggest a way out and prints as a cargo-style diagnostic.

use azsqlctl_core::CoreError;
use azsqlctl_core::arm::{CLIENT_ID_ENV, CLIENT_SECRET_ENV, TENANT_ID_ENV};
use azsqlctl_core::config::ConfigError;
use colored::Colorize;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Missing credential: environment variable AZURE_CLIENT_SECRET is not set
///
///   tip: management calls use a service principal from the environment
///       export AZURE_TENANT_ID=<tenant-id>
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[String]) -> Self {
        self.tips.push((description.to_string(), commands.to_vec()));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the azsqlctl application
#[derive(Error, Debug)]
pub enum AzSqlCtlError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured")]
    NoProfileConfigured,

    #[error("Profile '{profile}' is missing required field '{field}'")]
    IncompleteProfile { profile: String, field: String },

    #[error("Missing credential: environment variable {variable} is not set")]
    MissingCredentials { variable: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Management API error: {message}")]
    ApiError { message: String },

    #[error("{message}")]
    OperationFailed { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Database error: {message}")]
    SqlError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{failed} provisioning step(s) failed")]
    ProvisioningIncomplete { failed: usize },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for azsqlctl operations
pub type Result<T> = std::result::Result<T, AzSqlCtlError>;

impl AzSqlCtlError {
    /// Hints for resolving this error, each with optional example commands
    pub fn suggestions(&self) -> Vec<(String, Vec<String>)> {
        match self {
            AzSqlCtlError::ProfileNotFound { name } => vec![
                ("list available profiles".to_string(), vec!["azsqlctl profile list".to_string()]),
                (
                    format!("add a [profiles.{}] section to the config file", name),
                    vec!["azsqlctl profile path".to_string()],
                ),
            ],
            AzSqlCtlError::NoProfileConfigured => vec![(
                "create the config file with at least one profile".to_string(),
                vec!["azsqlctl profile path".to_string()],
            )],
            AzSqlCtlError::IncompleteProfile { profile, .. } => vec![(
                "check the profile".to_string(),
                vec![
                    format!("azsqlctl profile show {}", profile),
                    "azsqlctl profile validate".to_string(),
                ],
            )],
            AzSqlCtlError::MissingCredentials { .. } => vec![(
                "management calls use a service principal from the environment".to_string(),
                vec![
                    format!("export {}=<tenant-id>", TENANT_ID_ENV),
                    format!("export {}=<app-id>", CLIENT_ID_ENV),
                    format!("export {}=<secret>", CLIENT_SECRET_ENV),
                ],
            )],
            AzSqlCtlError::AuthenticationFailed { .. } => vec![
                (
                    "verify the service principal credentials and tenant".to_string(),
                    vec![],
                ),
                (
                    "make sure the principal has Contributor rights on the subscription".to_string(),
                    vec![],
                ),
            ],
            AzSqlCtlError::ConnectionError { message }
                if message.contains("certificate") || message.contains("TLS") =>
            {
                vec![(
                    "for a local server with a self-signed certificate set trust_server_certificate = true".to_string(),
                    vec![],
                )]
            }
            AzSqlCtlError::ConnectionError { .. } => vec![
                (
                    "check that the firewall rule covers this machine's public IP".to_string(),
                    vec!["azsqlctl profile show".to_string()],
                ),
                (
                    "make sure the database has been provisioned".to_string(),
                    vec!["azsqlctl provision".to_string()],
                ),
            ],
            AzSqlCtlError::Timeout { .. } => vec![(
                "raise timeouts.operation_timeout_secs in the profile; the operation may still finish in the background".to_string(),
                vec![],
            )],
            AzSqlCtlError::ProvisioningIncomplete { .. } => vec![(
                "rerun without --best-effort to stop at the first failure, or tear down".to_string(),
                vec!["azsqlctl deprovision".to_string()],
            )],
            AzSqlCtlError::SqlError { .. } => vec![(
                "the data operations expect the AdventureWorksLT sample database".to_string(),
                vec![],
            )],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());

        for (description, commands) in self.suggestions() {
            diag = diag.tip(&description, &commands);
        }

        diag.print();
    }
}

impl From<CoreError> for AzSqlCtlError {
    fn from(err: CoreError) -> Self {
        let err = match err {
            CoreError::Config(config_err) => return AzSqlCtlError::from(config_err),
            other => other,
        };
        let message = err.to_string();
        match err.root() {
            CoreError::MissingCredential { variable } => AzSqlCtlError::MissingCredentials {
                variable: variable.clone(),
            },
            CoreError::Config(_) => AzSqlCtlError::Configuration(message),
            _ if err.is_unauthorized() => AzSqlCtlError::AuthenticationFailed { message },
            _ if err.is_timeout() => AzSqlCtlError::Timeout { message },
            CoreError::Management(_) => AzSqlCtlError::ApiError { message },
            CoreError::OperationFailed { .. } => AzSqlCtlError::OperationFailed { message },
            CoreError::Connect(_) => AzSqlCtlError::ConnectionError { message },
            CoreError::Sql(_) | CoreError::Decode { .. } => AzSqlCtlError::SqlError { message },
            CoreError::Validation(_) => AzSqlCtlError::InvalidInput { message },
            _ => AzSqlCtlError::OperationFailed { message },
        }
    }
}

impl From<ConfigError> for AzSqlCtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => AzSqlCtlError::ProfileNotFound { name },
            ConfigError::NoProfiles { .. } => AzSqlCtlError::NoProfileConfigured,
            ConfigError::MissingField { profile, field } => {
                AzSqlCtlError::IncompleteProfile { profile, field }
            }
            other => AzSqlCtlError::Configuration(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AzSqlCtlError {
    fn from(err: serde_json::Error) -> Self {
        AzSqlCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<serde_yaml::Error> for AzSqlCtlError {
    fn from(err: serde_yaml::Error) -> Self {
        AzSqlCtlError::OutputError {
            message: format!("YAML error: {}", err),
        }
    }
}

impl From<std::io::Error> for AzSqlCtlError {
    fn from(err: std::io::Error) -> Self {
        AzSqlCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for AzSqlCtlError {
    fn from(err: anyhow::Error) -> Self {
        AzSqlCtlError::Configuration(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azsqlctl_core::ProvisionStep;
    use std::time::Duration;

    #[test]
    fn test_missing_credential_maps_to_variable() {
        let err: AzSqlCtlError = CoreError::MissingCredential {
            variable: CLIENT_SECRET_ENV.to_string(),
        }
        .into();
        assert!(matches!(
            err,
            AzSqlCtlError::MissingCredentials { ref variable } if variable == CLIENT_SECRET_ENV
        ));
        let tips = err.suggestions();
        assert!(tips[0].1.iter().any(|c| c.contains(TENANT_ID_ENV)));
    }

    #[test]
    fn test_provision_error_keeps_step_in_message() {
        let err: AzSqlCtlError = CoreError::Provision {
            step: ProvisionStep::Database,
            source: Box::new(CoreError::OperationTimeout(Duration::from_secs(60))),
        }
        .into();
        assert!(matches!(err, AzSqlCtlError::Timeout { .. }));
        assert!(err.to_string().contains("'database'"));
    }

    #[test]
    fn test_config_errors_map_to_profile_variants() {
        let err: AzSqlCtlError = CoreError::Config(ConfigError::ProfileNotFound {
            name: "prod".to_string(),
        })
        .into();
        assert!(matches!(err, AzSqlCtlError::ProfileNotFound { ref name } if name == "prod"));

        let err: AzSqlCtlError = ConfigError::NoProfiles {
            suggestion: String::new(),
        }
        .into();
        assert!(matches!(err, AzSqlCtlError::NoProfileConfigured));
    }

    #[test]
    fn test_connect_and_decode_errors() {
        let err: AzSqlCtlError = CoreError::Connect("refused".to_string()).into();
        assert!(matches!(err, AzSqlCtlError::ConnectionError { .. }));
        assert!(!err.suggestions().is_empty());

        let err: AzSqlCtlError = CoreError::Decode {
            column: "OrderDate".to_string(),
            message: "unexpected NULL".to_string(),
        }
        .into();
        assert!(matches!(err, AzSqlCtlError::SqlError { .. }));
    }
}

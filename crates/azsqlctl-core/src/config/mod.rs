//! Configuration and profile management for azsqlctl
//!
//! Each profile describes one deployment: subscription, location, resource
//! names, admin credentials, firewall rule and database options.
//!
//! # Features
//!
//! - Multiple named profiles with a default
//! - Admin password lookup from the OS keyring (optional)
//! - Environment variable expansion in config files
//! - Platform-specific config file locations

#![allow(clippy::module_inception)]

pub mod config;
pub mod credential;
pub mod error;
pub mod timeouts;

pub use config::{
    ADMIN_PASSWORD_ENV, Config, DatabaseOptions, EndpointOverrides, FirewallSettings, Profile,
    SUBSCRIPTION_ENV,
};
pub use credential::CredentialStore;
pub use error::{ConfigError, Result};
pub use timeouts::TimeoutConfig;

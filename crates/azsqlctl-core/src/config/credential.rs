//! Credential resolution with optional keyring support
//!
//! Secrets in a profile (the SQL admin password) are written as plaintext or
//! as a `keyring:<key>` reference, and can be overridden through an
//! environment variable.

use super::error::{ConfigError, Result};
use std::env;

/// Prefix that indicates a value should be retrieved from the keyring
const KEYRING_PREFIX: &str = "keyring:";

/// Service name for keyring entries
#[cfg(feature = "secure-storage")]
const SERVICE_NAME: &str = "azsqlctl";

/// Resolves secrets that may live in the environment or the OS keyring
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialStore;

impl CredentialStore {
    pub fn new() -> Self {
        Self
    }

    /// Retrieve a credential value
    ///
    /// Resolution order:
    /// 1. Environment variable (if `env_var` is provided and set)
    /// 2. Keyring, when the value starts with `keyring:`
    /// 3. The value itself
    pub fn get_credential(&self, value: &str, env_var: Option<&str>) -> Result<String> {
        if let Some(var) = env_var
            && let Ok(env_value) = env::var(var)
        {
            return Ok(env_value);
        }

        if !Self::is_keyring_reference(value) {
            return Ok(value.to_string());
        }

        #[cfg(feature = "secure-storage")]
        {
            let key = value.trim_start_matches(KEYRING_PREFIX);
            let entry = keyring::Entry::new(SERVICE_NAME, key)
                .map_err(|e| ConfigError::KeyringError(e.to_string()))?;
            entry.get_password().map_err(|e| {
                ConfigError::KeyringError(format!(
                    "Failed to retrieve credential '{}' from keyring: {}",
                    key, e
                ))
            })
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            Err(ConfigError::CredentialError(
                "Credential references keyring but secure-storage feature is not enabled"
                    .to_string(),
            ))
        }
    }

    /// Check if a value is a keyring reference
    pub fn is_keyring_reference(value: &str) -> bool {
        value.starts_with(KEYRING_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_storage() {
        let store = CredentialStore::new();

        let result = store.get_credential("s3cret!", None).unwrap();
        assert_eq!(result, "s3cret!");
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_override() {
        unsafe {
            env::set_var("AZSQLCTL_TEST_CREDENTIAL", "env-value");
        }

        let store = CredentialStore::new();
        let result = store
            .get_credential("config-value", Some("AZSQLCTL_TEST_CREDENTIAL"))
            .unwrap();
        assert_eq!(result, "env-value");

        unsafe {
            env::remove_var("AZSQLCTL_TEST_CREDENTIAL");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_unset_env_var_falls_back_to_value() {
        unsafe {
            env::remove_var("AZSQLCTL_TEST_UNSET");
        }

        let store = CredentialStore::new();
        let result = store
            .get_credential("config-value", Some("AZSQLCTL_TEST_UNSET"))
            .unwrap();
        assert_eq!(result, "config-value");
    }

    #[test]
    fn test_keyring_reference_detection() {
        assert!(CredentialStore::is_keyring_reference("keyring:admin"));
        assert!(!CredentialStore::is_keyring_reference("admin"));
        assert!(!CredentialStore::is_keyring_reference(""));
    }

    #[cfg(not(feature = "secure-storage"))]
    #[test]
    fn test_keyring_reference_without_feature_is_an_error() {
        let store = CredentialStore::new();
        let err = store.get_credential("keyring:admin", None).unwrap_err();
        assert!(err.to_string().contains("secure-storage"));
    }
}

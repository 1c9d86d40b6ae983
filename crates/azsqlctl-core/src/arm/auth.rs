//! Credentials for the management API
//!
//! Service principals authenticate with the OAuth2 client-credentials grant
//! against the identity platform. A pre-acquired bearer token can be supplied
//! instead, which is what local emulators and tests use.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use super::error::{ArmError, Result};
use crate::error::CoreError;

/// Environment variable holding the directory (tenant) id
pub const TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
/// Environment variable holding the application (client) id
pub const CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
/// Environment variable holding the client secret
pub const CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";

/// Public-cloud identity endpoint
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
/// Scope granting access to Azure Resource Manager
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

// Tokens are refreshed this long before they actually expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// How the management client authenticates
#[derive(Clone)]
pub enum Credential {
    /// Service principal with a client secret
    ClientSecret(ClientSecretCredential),
    /// Bearer token acquired elsewhere; never refreshed
    AccessToken(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ClientSecret(c) => f.debug_tuple("ClientSecret").field(c).finish(),
            Credential::AccessToken(_) => f.write_str("AccessToken(***)"),
        }
    }
}

impl Credential {
    /// Service principal credential read from the environment
    pub fn from_env() -> crate::Result<Self> {
        Ok(Credential::ClientSecret(ClientSecretCredential::from_env()?))
    }
}

/// Service principal identity used for the client-credentials grant
#[derive(Clone)]
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_url: String,
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("authority_url", &self.authority_url)
            .finish()
    }
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
        }
    }

    /// Read the service principal from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`
    /// and `AZURE_CLIENT_SECRET`
    ///
    /// The first unset (or empty) variable is reported by name.
    pub fn from_env() -> crate::Result<Self> {
        let tenant_id = require_env(TENANT_ID_ENV)?;
        let client_id = require_env(CLIENT_ID_ENV)?;
        let client_secret = require_env(CLIENT_SECRET_ENV)?;
        Ok(Self::new(tenant_id, client_id, client_secret))
    }

    /// Use a different identity endpoint (sovereign clouds, tests)
    #[must_use]
    pub fn with_authority(mut self, authority_url: impl Into<String>) -> Self {
        self.authority_url = authority_url.into();
        self
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Exchange the client secret for a management-scoped bearer token
    pub(crate) async fn request_token(&self, http: &reqwest::Client) -> Result<AccessToken> {
        let token_url = self.token_url();
        debug!(url = %token_url, client_id = %self.client_id, "Requesting management token");

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("scope", MANAGEMENT_SCOPE)
            .finish();

        let response = http
            .post(&token_url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&text)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or_else(|_| text.trim().to_string());
            return Err(ArmError::Token(format!("{} ({})", detail, status)));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ArmError::Token(format!("Failed to parse token response: {}", e)))?;

        let lifetime = token.expires_in();
        Ok(AccessToken::new(token.access_token, lifetime))
    }
}

fn require_env(variable: &str) -> crate::Result<String> {
    match std::env::var(variable) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CoreError::MissingCredential {
            variable: variable.to_string(),
        }),
    }
}

/// Bearer token with its expiry
#[derive(Clone)]
pub(crate) struct AccessToken {
    pub secret: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    pub fn new(secret: String, lifetime: Option<Duration>) -> Self {
        Self {
            secret,
            expires_at: lifetime.map(|l| Instant::now() + l),
        }
    }

    /// A token is reused until it is within the refresh margin of expiry
    pub fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    // v2.0 returns a number, v1.0 a string
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn expires_in(&self) -> Option<Duration> {
        let secs = match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64()?,
            serde_json::Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        Some(Duration::from_secs(secs))
    }
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            std::env::remove_var(TENANT_ID_ENV);
            std::env::remove_var(CLIENT_ID_ENV);
            std::env::remove_var(CLIENT_SECRET_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_reports_missing_variable() {
        clear_env();
        unsafe {
            std::env::set_var(TENANT_ID_ENV, "tenant");
        }

        let err = ClientSecretCredential::from_env().unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingCredential { ref variable } if variable == CLIENT_ID_ENV
        ));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_treats_empty_as_missing() {
        clear_env();
        unsafe {
            std::env::set_var(TENANT_ID_ENV, "");
        }

        let err = Credential::from_env().unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingCredential { ref variable } if variable == TENANT_ID_ENV
        ));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_success() {
        unsafe {
            std::env::set_var(TENANT_ID_ENV, "tenant");
            std::env::set_var(CLIENT_ID_ENV, "client");
            std::env::set_var(CLIENT_SECRET_ENV, "secret");
        }

        let credential = ClientSecretCredential::from_env().unwrap();
        assert_eq!(credential.tenant_id(), "tenant");
        assert_eq!(credential.client_id(), "client");
        assert_eq!(
            credential.token_url(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );

        clear_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credential = Credential::ClientSecret(ClientSecretCredential::new("t", "c", "hunter2"));
        assert!(!format!("{:?}", credential).contains("hunter2"));

        let token = Credential::AccessToken("eyJ0eXAi".to_string());
        assert!(!format!("{:?}", token).contains("eyJ0eXAi"));
    }

    #[test]
    fn test_token_freshness() {
        assert!(AccessToken::new("t".into(), None).is_fresh());
        assert!(AccessToken::new("t".into(), Some(Duration::from_secs(3600))).is_fresh());
        assert!(!AccessToken::new("t".into(), Some(Duration::from_secs(60))).is_fresh());
    }

    #[test]
    fn test_expires_in_number_or_string() {
        let v2: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":3599}"#).unwrap();
        assert_eq!(v2.expires_in(), Some(Duration::from_secs(3599)));

        let v1: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":"3599"}"#).unwrap();
        assert_eq!(v1.expires_in(), Some(Duration::from_secs(3599)));

        let none: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert_eq!(none.expires_in(), None);
    }
}

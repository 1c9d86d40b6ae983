//! HTTP client for Azure Resource Manager
//!
//! Thin wrapper over `reqwest` that adds bearer authentication, the
//! `api-version` query parameter and ARM error decoding. Resource-specific
//! calls live in the handler types ([`ResourceGroupHandler`](super::ResourceGroupHandler),
//! [`ServerHandler`](super::ServerHandler), ...).

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::auth::{AccessToken, Credential};
use super::error::{ArmError, Result};

/// Public-cloud management endpoint
pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";

const DEFAULT_USER_AGENT: &str = concat!("azsqlctl/", env!("CARGO_PKG_VERSION"));
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Management API client scoped to one subscription
///
/// Cheap to clone; clones share the HTTP connection pool and the token cache.
#[derive(Clone)]
pub struct ArmClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    subscription_id: String,
    credential: Credential,
    token: RwLock<Option<AccessToken>>,
}

/// Builder for [`ArmClient`]
#[derive(Debug)]
pub struct ArmClientBuilder {
    subscription_id: Option<String>,
    base_url: String,
    credential: Option<Credential>,
    user_agent: String,
    request_timeout: Duration,
}

impl Default for ArmClientBuilder {
    fn default() -> Self {
        Self {
            subscription_id: None,
            base_url: DEFAULT_MANAGEMENT_URL.to_string(),
            credential: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ArmClientBuilder {
    #[must_use]
    pub fn subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-request timeout (not the long-running operation timeout)
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ArmClient> {
        let subscription_id = self
            .subscription_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ArmError::Configuration("subscription id is required".to_string()))?;
        let credential = self
            .credential
            .ok_or_else(|| ArmError::Configuration("credential is required".to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.request_timeout)
            .build()?;

        Ok(ArmClient {
            inner: Arc::new(Inner {
                http,
                base_url: self.base_url.trim_end_matches('/').to_string(),
                subscription_id,
                credential,
                token: RwLock::new(None),
            }),
        })
    }
}

/// Status, headers and body of a successful management call
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ArmResponse {
    /// Deserialize the body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ArmError::InvalidResponse(format!("{} (status {}): {}", e, self.status, self.body))
        })
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl ArmClient {
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    pub fn subscription_id(&self) -> &str {
        &self.inner.subscription_id
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Path of a resource below this client's subscription
    pub(crate) fn subscription_path(&self, suffix: &str) -> String {
        format!(
            "/subscriptions/{}/{}",
            self.inner.subscription_id,
            suffix.trim_start_matches('/')
        )
    }

    pub(crate) fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.inner.base_url, path, api_version
        )
    }

    pub async fn get(&self, path: &str, api_version: &str) -> Result<ArmResponse> {
        let url = self.url(path, api_version);
        self.send(Method::GET, &url, None).await
    }

    pub async fn put<B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<ArmResponse> {
        let url = self.url(path, api_version);
        let payload = serde_json::to_string(body)
            .map_err(|e| ArmError::InvalidResponse(format!("Failed to encode request: {}", e)))?;
        self.send(Method::PUT, &url, Some(payload)).await
    }

    pub async fn delete(&self, path: &str, api_version: &str) -> Result<ArmResponse> {
        let url = self.url(path, api_version);
        self.send(Method::DELETE, &url, None).await
    }

    /// GET an absolute URL handed out by the service (operation status monitors)
    pub(crate) async fn get_absolute(&self, url: &str) -> Result<ArmResponse> {
        self.send(Method::GET, url, None).await
    }

    async fn send(&self, method: Method, url: &str, body: Option<String>) -> Result<ArmResponse> {
        let token = self.bearer_token().await?;
        debug!(method = %method, url = %url, "Management request");

        let mut request = self
            .inner
            .http
            .request(method.clone(), url)
            .bearer_auth(token);
        if let Some(body) = body {
            trace!(body = %redact_body(&body), "Request body");
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        debug!(method = %method, url = %url, status = status.as_u16(), "Management response");

        if !status.is_success() {
            return Err(ArmError::from_response(status, &body));
        }

        Ok(ArmResponse {
            status,
            headers,
            body,
        })
    }

    async fn bearer_token(&self) -> Result<String> {
        let credential = match &self.inner.credential {
            Credential::AccessToken(token) => return Ok(token.clone()),
            Credential::ClientSecret(credential) => credential,
        };

        {
            let cached = self.inner.token.read().await;
            if let Some(token) = cached.as_ref()
                && token.is_fresh()
            {
                return Ok(token.secret.clone());
            }
        }

        let mut cached = self.inner.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref()
            && token.is_fresh()
        {
            return Ok(token.secret.clone());
        }

        let token = credential.request_token(&self.inner.http).await?;
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }
}

// Request bodies may carry the administrator password
fn redact_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(mut value) => {
            if let Some(password) = value.pointer_mut("/properties/administratorLoginPassword") {
                *password = serde_json::Value::String("***".to_string());
            }
            value.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArmClient {
        ArmClient::builder()
            .subscription_id("sub-1")
            .base_url("http://localhost:8080/")
            .credential(Credential::AccessToken("token".to_string()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_subscription_and_credential() {
        let err = ArmClient::builder()
            .credential(Credential::AccessToken("t".to_string()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ArmError::Configuration(_)));

        let err = ArmClient::builder()
            .subscription_id("sub")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ArmError::Configuration(_)));
    }

    #[test]
    fn test_url_building() {
        let client = client();
        assert_eq!(client.base_url(), "http://localhost:8080");

        let path = client.subscription_path("resourcegroups/rg");
        assert_eq!(path, "/subscriptions/sub-1/resourcegroups/rg");
        assert_eq!(
            client.url(&path, "2021-04-01"),
            "http://localhost:8080/subscriptions/sub-1/resourcegroups/rg?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_redact_body_hides_password() {
        let body = r#"{"location":"westeurope","properties":{"administratorLogin":"sa","administratorLoginPassword":"hunter2"}}"#;
        let redacted = redact_body(body);
        assert!(!redacted.contains("hunter2"));
        assert!(redacted.contains("administratorLogin"));
    }
}

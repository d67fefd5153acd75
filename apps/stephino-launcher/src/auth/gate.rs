use crate::auth::error::AuthError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const VERSION_PATH: &str = "/wp-json/stephino-rpg/v1/version";
pub const AUTH_PATH: &str = "/wp-json/stephino-rpg/v1/auth";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Normalized reply of the credential exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResponse {
    pub status: u16,
    pub result: Option<String>,
    pub message: Option<String>,
}

impl ExchangeResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }

    /// Secret the server handed back, if it should replace the cached one.
    pub fn rotated_secret(&self) -> Option<&str> {
        if !self.is_ok() {
            return None;
        }
        self.result.as_deref().filter(|secret| secret.chars().count() > 1)
    }
}

/// The two calls of the handshake. One request in flight at a time.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn probe_version(&self, server: &Url) -> Result<String, AuthError>;

    async fn exchange_credentials(
        &self,
        server: &Url,
        user_email: &str,
        user_password: &str,
    ) -> Result<ExchangeResponse, AuthError>;
}

#[derive(Debug, Clone)]
pub struct GateClient {
    client: Client,
}

impl GateClient {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| AuthError::Config(err.to_string()))?;
        Ok(Self { client })
    }
}

/// Builds `scheme://host[:port]{path}` from the server URL, dropping its path and query.
pub fn endpoint(server: &Url, path: &str) -> Url {
    let mut url = server.clone();
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    url
}

pub fn parse_version(body: &str) -> Result<String, AuthError> {
    let value: Value = serde_json::from_str(body)?;
    value
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(AuthError::VersionUndetected)
}

pub fn parse_exchange(status: u16, body: &str) -> Result<ExchangeResponse, AuthError> {
    let value: Value = serde_json::from_str(body)?;
    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
    Ok(ExchangeResponse {
        status,
        result: field("result"),
        message: field("message").filter(|message| !message.is_empty()),
    })
}

#[async_trait]
impl SessionTransport for GateClient {
    async fn probe_version(&self, server: &Url) -> Result<String, AuthError> {
        let url = endpoint(server, VERSION_PATH);
        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            tracing::debug!(
                target: "stephino::auth",
                status = %response.status(),
                "version probe rejected"
            );
            return Err(AuthError::ServerOffline);
        }

        let body = response.text().await?;
        tracing::debug!(target: "stephino::auth", %body, "version probe response");
        parse_version(&body)
    }

    async fn exchange_credentials(
        &self,
        server: &Url,
        user_email: &str,
        user_password: &str,
    ) -> Result<ExchangeResponse, AuthError> {
        let url = endpoint(server, AUTH_PATH);
        let response = self
            .client
            .post(url)
            .form(&[("userEmail", user_email), ("userPassword", user_password)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(target: "stephino::auth", status, %body, "credential exchange response");
        parse_exchange(status, &body)
    }
}

//! Admin token sources for the CLI bridge
//!
//! Every bridge call carries an admin token. Three sources are supported:
//! 1. A fixed token handed in by the caller ([`StaticToken`])
//! 2. `MAGENTO_ADMIN_TOKEN` from the environment ([`EnvToken`])
//! 3. The application's admin token web API, using the configured admin
//!    credentials ([`WebApiAuth`])

use crate::bridge::endpoint_url;
use async_trait::async_trait;
use mftf_core::{MftfConfig, MftfError, Result};
use reqwest::Url;
use serde::Serialize;
use std::env;
use tokio::sync::Mutex;

/// Environment variable read by [`EnvToken`]
pub const ADMIN_TOKEN_ENV: &str = "MAGENTO_ADMIN_TOKEN";

const ADMIN_TOKEN_PATH: &str = "rest/V1/integration/admin/token";

/// Supplies the admin token sent with bridge calls
#[async_trait]
pub trait AdminTokenProvider: Send + Sync {
    async fn admin_token(&self) -> Result<String>;
}

/// A token known up front
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AdminTokenProvider for StaticToken {
    async fn admin_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Reads [`ADMIN_TOKEN_ENV`] on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvToken;

#[async_trait]
impl AdminTokenProvider for EnvToken {
    async fn admin_token(&self) -> Result<String> {
        match env::var(ADMIN_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::debug!("Using admin token from {}", ADMIN_TOKEN_ENV);
                Ok(token)
            }
            _ => Err(MftfError::Auth(format!(
                "No admin token found. Set {}=<token>, or configure admin credentials:\n\
                 - MAGENTO_ADMIN_USERNAME\n\
                 - MAGENTO_ADMIN_PASSWORD",
                ADMIN_TOKEN_ENV
            ))),
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Fetches a token from the admin token web API, once
///
/// The first successful token is cached for the life of the provider.
pub struct WebApiAuth {
    client: reqwest::Client,
    endpoint: Url,
    username: String,
    password: String,
    cached: Mutex<Option<String>>,
}

impl WebApiAuth {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint_url(base_url, ADMIN_TOKEN_PATH)?,
            username: username.into(),
            password: password.into(),
            cached: Mutex::new(None),
        })
    }

    /// Build from the configured base URL and admin credentials
    pub fn from_config(config: &MftfConfig) -> Result<Self> {
        match (&config.admin.username, &config.admin.password) {
            (Some(username), Some(password)) => Self::new(&config.url, username, password),
            _ => Err(MftfError::Config(
                "Admin credentials missing. Set MAGENTO_ADMIN_USERNAME and MAGENTO_ADMIN_PASSWORD"
                    .to_string(),
            )),
        }
    }

    async fn request_token(&self) -> Result<String> {
        tracing::info!("Requesting admin token for {}", self.username);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&TokenRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| MftfError::Transport(format!("Failed to reach {}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(MftfError::Auth(format!(
                "Admin token request failed ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<String>()
            .await
            .map_err(|e| MftfError::Auth(format!("Unexpected admin token response: {}", e)))
    }
}

#[async_trait]
impl AdminTokenProvider for WebApiAuth {
    async fn admin_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

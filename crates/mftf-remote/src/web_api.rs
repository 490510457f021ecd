//! Authenticated calls to the application's REST web API
//!
//! Used for cleanup that has no console command, such as deleting an entity
//! a test created.

use crate::auth::AdminTokenProvider;
use crate::bridge::endpoint_url;
use mftf_core::{MftfConfig, MftfError, Result};
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, info};

/// REST client sending the admin token as a bearer token
pub struct WebApiClient {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<dyn AdminTokenProvider>,
}

impl WebApiClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn AdminTokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            auth,
        }
    }

    pub fn from_config(config: &MftfConfig, auth: Arc<dyn AdminTokenProvider>) -> Self {
        Self::new(config.url.clone(), auth)
    }

    /// Absolute URLs are used as is; paths such as `/V1/products/sku` resolve under `<base>/rest/`
    pub fn entity_url(&self, url: &str) -> Result<Url> {
        let url = url.trim();
        if url.starts_with("http://") || url.starts_with("https://") {
            return Url::parse(url)
                .map_err(|e| MftfError::Config(format!("Invalid entity url {}: {}", url, e)));
        }
        endpoint_url(&self.base_url, &format!("rest/{}", url.trim_start_matches('/')))
    }

    /// Send a DELETE for the entity at `url` and return the response body
    pub async fn delete_entity_by_url(&self, url: &str) -> Result<String> {
        let url = self.entity_url(url)?;
        let token = self.auth.admin_token().await?;

        debug!("DELETE {}", url);
        let response = self
            .client
            .delete(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| MftfError::Transport(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MftfError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(MftfError::Transport(format!(
                "DELETE {} returned {}: {}",
                url,
                status,
                body.trim()
            )));
        }

        info!("Deleted {}", url);
        Ok(body.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    fn client(base: &str) -> WebApiClient {
        WebApiClient::new(base, Arc::new(StaticToken::new("admin-token")))
    }

    #[test]
    fn test_entity_url() {
        let api = client("http://magento.local/index.php/");
        assert_eq!(
            api.entity_url("/V1/products/simple-1").unwrap().as_str(),
            "http://magento.local/rest/V1/products/simple-1"
        );
        assert_eq!(
            api.entity_url("https://other.example/rest/V1/x").unwrap().as_str(),
            "https://other.example/rest/V1/x"
        );
    }

    #[tokio::test]
    async fn test_delete_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/rest/V1/products/simple-1")
            .match_header("authorization", "Bearer admin-token")
            .with_status(200)
            .with_body("true\n")
            .create_async()
            .await;

        let body = client(&server.url())
            .delete_entity_by_url("/V1/products/simple-1")
            .await
            .unwrap();

        assert_eq!(body, "true");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_entity_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/rest/V1/categories/404")
            .with_status(404)
            .with_body(r#"{"message":"No such entity with id = 404"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .delete_entity_by_url("V1/categories/404")
            .await
            .unwrap_err();

        match err {
            MftfError::Transport(msg) => assert!(msg.contains("404")),
            other => panic!("unexpected error: {other}"),
        }
    }
}

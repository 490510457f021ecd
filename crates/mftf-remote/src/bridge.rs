//! HTTP bridge to the application's console
//!
//! Console commands are not run locally. The application exposes an entrypoint
//! (by default `dev/tests/acceptance/utils/command.php`) that accepts a form
//! POST carrying an admin token and the command, runs it, and answers with the
//! command output as plain text.

use crate::auth::AdminTokenProvider;
use async_trait::async_trait;
use mftf_core::{MftfConfig, MftfError, Result};
use regex::Regex;
use reqwest::Url;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Returned in place of an empty command output
pub const NO_OUTPUT: &str = "CLI did not return output.";

/// Runs a console command somewhere and returns its cleaned output
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command`, optionally bounded by `timeout` seconds and with extra `arguments`
    async fn execute(
        &self,
        command: &str,
        timeout: Option<u64>,
        arguments: Option<&str>,
    ) -> Result<String>;
}

/// [`CommandExecutor`] that POSTs to the exposed command entrypoint
pub struct CliBridge {
    client: reqwest::Client,
    endpoint: Url,
    command_parameter: String,
    auth: Arc<dyn AdminTokenProvider>,
}

impl CliBridge {
    /// Create a bridge posting to `endpoint`, sending the command in `command_parameter`
    pub fn new(
        endpoint: Url,
        command_parameter: impl Into<String>,
        auth: Arc<dyn AdminTokenProvider>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            command_parameter: command_parameter.into(),
            auth,
        }
    }

    /// Build the bridge from the suite configuration
    pub fn from_config(config: &MftfConfig, auth: Arc<dyn AdminTokenProvider>) -> Result<Self> {
        let endpoint = endpoint_url(&config.url, &config.cli.command_path)?;
        Ok(Self::new(endpoint, config.cli.command_parameter.clone(), auth))
    }

    /// Where commands are posted
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn form_fields(
        &self,
        token: String,
        command: &str,
        timeout: Option<u64>,
        arguments: Option<&str>,
    ) -> Vec<(String, String)> {
        let encoded_command: String =
            url::form_urlencoded::byte_serialize(command.as_bytes()).collect();
        vec![
            ("token".to_string(), token),
            (self.command_parameter.clone(), encoded_command),
            ("arguments".to_string(), arguments.unwrap_or_default().to_string()),
            (
                "timeout".to_string(),
                timeout.map(|t| t.to_string()).unwrap_or_default(),
            ),
        ]
    }
}

#[async_trait]
impl CommandExecutor for CliBridge {
    async fn execute(
        &self,
        command: &str,
        timeout: Option<u64>,
        arguments: Option<&str>,
    ) -> Result<String> {
        let token = self.auth.admin_token().await?;
        let fields = self.form_fields(token, command, timeout, arguments);

        info!("Running CLI command: {}", command);
        debug!("POST {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&fields)
            .send()
            .await
            .map_err(|e| MftfError::Transport(format!("Failed to reach {}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(MftfError::Transport(format!(
                "CLI endpoint returned {}: {}",
                status,
                clean_output(&body)
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MftfError::Transport(format!("Failed to read CLI response: {}", e)))?;

        Ok(clean_output(&body))
    }
}

/// Join the application base URL with an endpoint path
///
/// Any `index.php` is removed from the base and slashes at the seam are
/// collapsed. A base without a scheme is assumed to be `http://`.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<Url> {
    let base = base_url.trim().trim_end_matches('/').replace("index.php", "");
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Err(MftfError::Config("No base url configured".to_string()));
    }

    let mut joined = format!("{}/{}", base, path.trim_start_matches('/'));
    if !joined.contains("://") {
        joined = format!("http://{}", joined);
    }

    Url::parse(&joined)
        .map_err(|e| MftfError::Config(format!("Invalid endpoint url {}: {}", joined, e)))
}

fn control_characters() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("control character pattern is valid")
    })
}

/// Strip control characters (keeping tab, newline and carriage return) and trim
///
/// An output with nothing left becomes [`NO_OUTPUT`].
pub fn clean_output(raw: &str) -> String {
    let cleaned = control_characters().replace_all(raw, "");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        NO_OUTPUT.to_string()
    } else {
        trimmed.to_string()
    }
}

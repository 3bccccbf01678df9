//! HTTPS transport posting envelopes to a skill endpoint.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{OAuthConfig, TransportConfig};
use crate::error::{CheckError, Result};
use crate::protocol::RequestKind;

use super::Transport;

/// Posts each envelope as JSON and returns the response body.
///
/// When the endpoint answers `401` or `403` and an [`OAuthRefresher`] is
/// configured, the access token is refreshed once and the request retried
/// once. A second rejection is returned as a transport error.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    refresher: Option<OAuthRefresher>,
}

impl HttpTransport {
    pub fn from_config(config: &TransportConfig, access_token: Option<String>) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| {
                CheckError::Config(
                    "transport endpoint is empty; set [transport].endpoint or --endpoint"
                        .to_string(),
                )
            })?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| CheckError::Config(format!("http client: {err}")))?;
        let refresher = config
            .oauth
            .as_ref()
            .map(|oauth| OAuthRefresher::new(client.clone(), oauth));
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            access_token,
            refresher,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn post(&self, envelope: &[u8]) -> Result<reqwest::blocking::Response> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(envelope.to_vec());
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .map_err(|err| CheckError::Transport(format!("request to {} failed: {err}", self.endpoint)))
    }
}

impl Transport for HttpTransport {
    fn fire(&mut self, kind: RequestKind, envelope: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut response = self.post(envelope)?;
        if is_auth_rejection(response.status()) {
            if let Some(refresher) = self.refresher.as_mut() {
                warn!(status = %response.status(), %kind, "skill rejected credentials; refreshing token");
                self.access_token = Some(refresher.refresh()?);
                response = self.post(envelope)?;
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::Transport(format!(
                "{kind} to {} returned HTTP {status}",
                self.endpoint
            )));
        }
        let body = response
            .bytes()
            .map_err(|err| CheckError::Transport(format!("reading response body: {err}")))?;
        debug!(%kind, %status, bytes = body.len(), "skill answered");
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(body.to_vec()))
    }
}

const fn is_auth_rejection(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Exchanges a refresh token for a new access token.
pub struct OAuthRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl OAuthRefresher {
    pub fn new(client: Client, config: &OAuthConfig) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
        }
    }

    /// Current refresh token; servers may rotate it on every exchange.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn refresh(&mut self) -> Result<String> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

        let response = self
            .client
            .post(&self.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(form)
            .send()
            .map_err(|err| CheckError::Transport(format!("token refresh failed: {err}")))?;
        if !response.status().is_success() {
            return Err(CheckError::Transport(format!(
                "token refresh HTTP {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .map_err(|err| CheckError::Transport(format!("token response parse: {err}")))?;
        if let Some(rotated) = token.refresh_token {
            self.refresh_token = rotated;
        }
        debug!(token_url = %self.token_url, "access token refreshed");
        Ok(token.access_token)
    }
}

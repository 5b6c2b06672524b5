//! JSON fetcher for entry points
//!
//! One GET per call: no retries, no caching. Every outcome is folded into a
//! [`FetchResult`] so a failing endpoint never takes the run down with it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::GalleonConfig;
use crate::credential::{resolve_credential, CredentialEnvironment, CredentialSource};
use crate::error::Result;

const JSON_MIME: &str = "application/json";
const USER_AGENT: &str = concat!("galleon/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;

/// Why an entry point produced no data
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFailure {
    /// No response, unusable endpoint or malformed payload
    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("HTTP error {status}")]
    Http { status: u16 },

    #[error("unexpected content-type {}", .content_type.as_deref().unwrap_or("(none)"))]
    BadContentType { content_type: Option<String> },

    /// Credentials were requested but no source produced one
    #[error("authentication required but no credential was found")]
    AuthRequiredMissing,
}

pub type FetchResult = std::result::Result<Value, FetchFailure>;

/// Anything that can turn an endpoint into JSON
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn fetch(&self, endpoint: &str, sources: &[CredentialSource]) -> FetchResult;
}

/// `reqwest`-backed [`JsonSource`]
#[derive(Clone)]
pub struct HttpFetcher {
    /// Shared HTTP client (connection pooling)
    client: reqwest::Client,
    /// Base for relative endpoints such as `/api/items`
    base_url: Option<Url>,
    environment: Arc<dyn CredentialEnvironment>,
}

impl HttpFetcher {
    /// Create a fetcher without timeout or base URL
    pub fn new(environment: Arc<dyn CredentialEnvironment>) -> Result<Self> {
        Self::build(environment, None, None)
    }

    pub fn from_config(
        config: &GalleonConfig,
        environment: Arc<dyn CredentialEnvironment>,
    ) -> Result<Self> {
        let base_url = config.base_url.as_deref().map(Url::parse).transpose()?;
        let timeout = config.timeout_secs.map(Duration::from_secs);
        Self::build(environment, base_url, timeout)
    }

    fn build(
        environment: Arc<dyn CredentialEnvironment>,
        base_url: Option<Url>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            environment,
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Absolute URL for `endpoint`, joined onto the base URL when relative
    pub fn endpoint_url(&self, endpoint: &str) -> std::result::Result<Url, FetchFailure> {
        match Url::parse(endpoint) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .as_ref()
                .ok_or_else(|| FetchFailure::Network {
                    reason: format!("relative endpoint '{endpoint}' without a base URL"),
                })?
                .join(endpoint)
                .map_err(|e| FetchFailure::Network {
                    reason: format!("invalid endpoint '{endpoint}': {e}"),
                }),
            Err(e) => Err(FetchFailure::Network {
                reason: format!("invalid endpoint '{endpoint}': {e}"),
            }),
        }
    }
}

#[async_trait]
impl JsonSource for HttpFetcher {
    #[instrument(skip(self, sources), fields(auth_sources = sources.len()))]
    async fn fetch(&self, endpoint: &str, sources: &[CredentialSource]) -> FetchResult {
        info!("Starting fetch");

        let authorization = if sources.is_empty() {
            None
        } else {
            match resolve_credential(sources, self.environment.as_ref()) {
                Some(header) => Some(header),
                None => {
                    warn!("Credentials required but none found; request not sent");
                    return Err(FetchFailure::AuthRequiredMissing);
                }
            }
        };

        let url = self.endpoint_url(endpoint)?;
        let mut request = self.client.get(url).header(CONTENT_TYPE, JSON_MIME);
        if let Some(header) = &authorization {
            request = request.header(AUTHORIZATION, header);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Request failed");
            FetchFailure::Network {
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "HTTP error");
            return Err(FetchFailure::Http {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(content_type = ?content_type, "Received response");

        let is_json = content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains(JSON_MIME));
        if !is_json {
            warn!(content_type = ?content_type, "Unexpected content-type");
            return Err(FetchFailure::BadContentType { content_type });
        }

        let body = response.bytes().await.map_err(|e| FetchFailure::Network {
            reason: format!("failed to read response: {e}"),
        })?;
        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "Malformed JSON payload");
            FetchFailure::Network {
                reason: format!("malformed JSON payload: {e}"),
            }
        })?;

        info!(bytes = body.len(), "Received data");
        Ok(value)
    }
}

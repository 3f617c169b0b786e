//! HTTP subscription fetcher.

use async_trait::async_trait;
use boxwiz_types::constants::MAX_SUBSCRIPTION_SIZE;
use boxwiz_types::{Result, SubscriptionFetcher, WizardError};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::links::decode_subscription;

/// Fetcher settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Sent as `User-Agent`; a neutral value keeps providers from
    /// answering with a full client configuration
    pub user_agent: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Largest accepted body
    pub max_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("boxwiz/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            max_size: MAX_SUBSCRIPTION_SIZE,
        }
    }
}

/// [`SubscriptionFetcher`] over `reqwest`.
pub struct HttpFetcher {
    config: FetchConfig,
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let agent = header::HeaderValue::from_str(&config.user_agent)
            .map_err(|e| WizardError::Config(format!("Invalid user agent: {}", e)))?;
        headers.insert(header::USER_AGENT, agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| WizardError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Download the raw body without decoding it.
    pub async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "fetching subscription");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WizardError::Fetch(format!("failed to fetch subscription: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(WizardError::Fetch(format!(
                "subscription server returned status {}",
                response.status().as_u16()
            )));
        }

        if let Some(len) = response.content_length() {
            if len > self.config.max_size as u64 {
                return Err(WizardError::Fetch(format!(
                    "subscription content too large (exceeds {} bytes)",
                    self.config.max_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WizardError::Fetch(format!("failed to read subscription content: {}", e)))?;

        if bytes.is_empty() {
            return Err(WizardError::Fetch("subscription returned empty content".to_string()));
        }
        if bytes.len() > self.config.max_size {
            return Err(WizardError::Fetch(format!(
                "subscription content too large (exceeds {} bytes)",
                self.config.max_size
            )));
        }
        debug!(url, bytes = bytes.len(), "subscription fetched");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SubscriptionFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let raw = self.fetch_raw(url).await?;
        decode_subscription(&raw)
            .map_err(|e| WizardError::Fetch(format!("failed to decode subscription content: {}", e)))
    }
}

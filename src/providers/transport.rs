use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::domain::Provider;
use crate::providers::error::ProviderError;
use crate::resilience::{retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryPolicy};

/// How a provider API authenticates outbound calls
#[derive(Debug, Clone)]
pub enum ApiAuth {
    /// API key sent in a named header
    Header { name: &'static str, key: String },
    Bearer(String),
}

/// JSON-over-HTTP client for one provider, with retry and a circuit breaker
pub struct HttpTransport {
    provider: Provider,
    base_url: String,
    client: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(
        provider: Provider,
        base_url: &str,
        auth: ApiAuth,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ProviderError::Configuration(format!("{} API URL is required", provider)));
        }

        let mut headers = HeaderMap::new();
        match auth {
            ApiAuth::Header { name, key } => {
                if key.is_empty() {
                    return Err(ProviderError::Configuration(format!("{} API key is required", provider)));
                }
                let value = HeaderValue::from_str(&key)
                    .map_err(|e| ProviderError::Configuration(format!("Invalid API key format: {}", e)))?;
                headers.insert(HeaderName::from_static(name), value);
            }
            ApiAuth::Bearer(token) => {
                if token.is_empty() {
                    return Err(ProviderError::Configuration(format!("{} API token is required", provider)));
                }
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ProviderError::Configuration(format!("Invalid API token format: {}", e)))?;
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            provider,
            base_url,
            client,
            circuit_breaker: CircuitBreaker::new(provider.as_str(), CircuitBreakerConfig::default()),
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn with_resilience(mut self, retry_policy: RetryPolicy, breaker: CircuitBreakerConfig) -> Self {
        self.retry_policy = retry_policy;
        self.circuit_breaker = CircuitBreaker::new(self.provider.as_str(), breaker);
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        if !self.circuit_breaker.allow_request() {
            warn!(provider = %self.provider, "Circuit open, skipping call to {}", path);
            return Err(ProviderError::CircuitOpen(self.provider.to_string()));
        }

        let url = self.build_url(path);
        let label = format!("{} POST {}", self.provider, path);
        let result = retry_with_backoff(&self.retry_policy, &label, || self.send_once(&url, body)).await;

        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            // Client-side rejections say nothing about provider health
            Err(ProviderError::InvalidRequest(_)) => {}
            Err(_) => self.circuit_breaker.record_failure(),
        }
        result
    }

    async fn send_once<B, T>(&self, url: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        debug!(provider = %self.provider, "POST {}", url);

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(provider = %self.provider, "Provider API error: {} - {}", status, text);
            return Err(ProviderError::from_status_code(status.as_u16(), text));
        }

        serde_json::from_str(&text).map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))
    }
}

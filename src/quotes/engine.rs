use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::{ProviderFailure, QuoteComparison, QuoteRequest};
use crate::providers::{ProviderAdapter, ProviderError, ProviderRegistry};
use crate::quotes::validation::{QuoteRequestInput, QuoteValidator, ValidationError};

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No print provider returned a quote")]
    NoProvidersAvailable { failures: Vec<ProviderFailure> },
}

/// Fans a quote request out to providers and ranks what comes back
pub struct QuoteEngine {
    registry: ProviderRegistry,
    validator: QuoteValidator,
    call_timeout: Duration,
}

impl QuoteEngine {
    pub fn new(registry: ProviderRegistry, call_timeout: Duration) -> Self {
        Self {
            registry,
            validator: QuoteValidator::new(),
            call_timeout,
        }
    }

    pub async fn request_quotes(&self, input: &QuoteRequestInput) -> Result<QuoteComparison, QuoteError> {
        let request = self.validator.validate(input)?;
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut failures = Vec::new();
        let adapters: Vec<Arc<dyn ProviderAdapter>> = match request.provider {
            Some(provider) => match self.registry.get(provider) {
                Some(adapter) => vec![adapter],
                None => {
                    failures.push(ProviderFailure {
                        provider,
                        reason: "provider is not configured".to_string(),
                    });
                    Vec::new()
                }
            },
            None => self.registry.adapters(),
        };

        debug!(request_id = %request_id, "Requesting quotes from {} provider(s)", adapters.len());

        let calls = adapters.iter().map(|adapter| self.quote_one(adapter.as_ref(), &request));
        let results = join_all(calls).await;

        let mut quotes = Vec::new();
        for (adapter, result) in adapters.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    warn!(request_id = %request_id, provider = %adapter.provider(), "Quote unavailable: {}", e);
                    failures.push(ProviderFailure {
                        provider: adapter.provider(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        match QuoteComparison::rank(request_id.clone(), quotes, failures.clone()) {
            Some(comparison) => {
                info!(
                    request_id = %request_id,
                    "Ranked {} quote(s), cheapest from {}",
                    comparison.quotes().len(),
                    comparison.cheapest().provider
                );
                Ok(comparison)
            }
            None => Err(QuoteError::NoProvidersAvailable { failures }),
        }
    }

    async fn quote_one(
        &self,
        adapter: &dyn ProviderAdapter,
        request: &QuoteRequest,
    ) -> Result<crate::domain::Quote, ProviderError> {
        match timeout(self.call_timeout, adapter.request_quote(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.call_timeout)),
        }
    }
}

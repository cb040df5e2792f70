pub mod error;
pub mod lulu;
pub mod prodigi;
pub mod transport;

pub use error::ProviderError;
pub use lulu::LuluAdapter;
pub use prodigi::ProdigiAdapter;
pub use transport::{ApiAuth, HttpTransport};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProviderSettings;
use crate::domain::{Provider, Quote, QuoteRequest, StatusUpdate};
use crate::resilience::CircuitState;
use crate::webhooks::parser::{ParseError, ParsedWebhook};
use crate::webhooks::signature::SignatureScheme;

/// How a provider authenticates the webhooks it sends us
#[derive(Debug, Clone)]
pub struct WebhookAuth {
    pub scheme: SignatureScheme,
    /// Request header carrying the signature
    pub header: String,
    pub secret: Option<String>,
}

impl WebhookAuth {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            scheme: settings.signature_scheme,
            header: settings.signature_header.clone(),
            secret: settings.webhook_secret.clone(),
        }
    }
}

/// Everything that differs between print vendors.
///
/// `parse` and `extract` are pure; only `request_quote` performs I/O.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    fn webhook_auth(&self) -> &WebhookAuth;

    /// Validate the envelope and map the native event name
    fn parse(&self, raw_body: &[u8]) -> Result<ParsedWebhook, ParseError>;

    /// Normalise a parsed webhook into a status update
    fn extract(&self, parsed: &ParsedWebhook) -> Result<StatusUpdate, ParseError>;

    async fn request_quote(&self, request: &QuoteRequest) -> Result<Quote, ProviderError>;

    fn circuit_state(&self) -> CircuitState;
}

/// Adapters available to this process, keyed by provider
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn is_registered(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }

    /// Registered adapters in provider-name order
    pub fn adapters(&self) -> Vec<Arc<dyn ProviderAdapter>> {
        let mut adapters: Vec<_> = self.adapters.values().cloned().collect();
        adapters.sort_by_key(|a| a.provider().as_str());
        adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Money amount sent either as a JSON number or a decimal string
pub(crate) fn parse_amount(value: Option<&serde_json::Value>) -> Option<f64> {
    let amount = match value? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

/// Build an adapter for every provider that has one and is fully configured
pub fn build_registry(
    settings: &[ProviderSettings],
    request_timeout: std::time::Duration,
) -> (ProviderRegistry, Vec<(Provider, ProviderError)>) {
    let mut registry = ProviderRegistry::new();
    let mut skipped = Vec::new();

    for s in settings {
        let adapter: Result<Arc<dyn ProviderAdapter>, ProviderError> = match s.provider {
            Provider::Prodigi => ProdigiAdapter::new(s, request_timeout).map(|a| Arc::new(a) as Arc<dyn ProviderAdapter>),
            Provider::Lulu => LuluAdapter::new(s, request_timeout).map(|a| Arc::new(a) as Arc<dyn ProviderAdapter>),
            Provider::Peecho => continue,
        };
        match adapter {
            Ok(adapter) => registry.register(adapter),
            Err(e) => skipped.push((s.provider, e)),
        }
    }

    (registry, skipped)
}

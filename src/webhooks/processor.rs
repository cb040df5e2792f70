//! Inbound webhook pipeline: route, verify, parse, apply, notify.

use chrono::Utc;
use poem::http::{HeaderMap, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{Provider, ProviderStatus, UnknownProvider, WebhookEvent};
use crate::notifications::{NotificationPolicy, Notifier};
use crate::orders::{ApplyOutcome, IgnoreReason, OrderRepository, OrderStateMachine, RepositoryError, UnmatchedWebhook};
use crate::providers::ProviderRegistry;
use crate::webhooks::parser::ParseError;
use crate::webhooks::signature::SignatureVerifier;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error(transparent)]
    UnknownProvider(#[from] UnknownProvider),

    #[error("Webhooks from {0} are not supported yet")]
    NotImplemented(Provider),

    #[error("Provider {0} is not configured")]
    ProviderNotConfigured(Provider),

    #[error("Webhook signature verification failed for {0}")]
    Authentication(Provider),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            WebhookError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            WebhookError::ProviderNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::Authentication(_) => StatusCode::UNAUTHORIZED,
            WebhookError::Parse(_) => StatusCode::BAD_REQUEST,
            WebhookError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller
    pub fn public_message(&self) -> String {
        match self {
            WebhookError::Repository(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied,
    Duplicate,
    Stale,
    OrderNotFound,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied => "applied",
            WebhookOutcome::Duplicate => "duplicate",
            WebhookOutcome::Stale => "stale",
            WebhookOutcome::OrderNotFound => "order_not_found",
        }
    }
}

/// Result of a webhook that was accepted
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookAck {
    pub provider: Provider,
    pub event: WebhookEvent,
    pub merchant_reference: String,
    pub outcome: WebhookOutcome,
    pub notified: bool,
}

pub struct WebhookProcessor {
    registry: ProviderRegistry,
    verifier: SignatureVerifier,
    repository: Arc<dyn OrderRepository>,
    state_machine: OrderStateMachine,
    policy: NotificationPolicy,
    notifier: Arc<dyn Notifier>,
}

impl WebhookProcessor {
    pub fn new(
        registry: ProviderRegistry,
        verifier: SignatureVerifier,
        repository: Arc<dyn OrderRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            verifier,
            state_machine: OrderStateMachine::new(repository.clone()),
            repository,
            policy: NotificationPolicy::new(),
            notifier,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Handle one delivery. `raw_body` must be the bytes exactly as received.
    pub async fn process(
        &self,
        provider_id: &str,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<WebhookAck, WebhookError> {
        let provider: Provider = provider_id.parse()?;
        if provider.status() == ProviderStatus::NotImplemented {
            return Err(WebhookError::NotImplemented(provider));
        }
        let adapter = self
            .registry
            .get(provider)
            .ok_or(WebhookError::ProviderNotConfigured(provider))?;

        let auth = adapter.webhook_auth();
        let signature = headers.get(auth.header.as_str()).and_then(|v| v.to_str().ok());
        if !self
            .verifier
            .verify(provider, auth.scheme, raw_body, signature, auth.secret.as_deref())
        {
            warn!(provider = %provider, "Rejected webhook with invalid signature");
            return Err(WebhookError::Authentication(provider));
        }

        let parsed = adapter.parse(raw_body).map_err(|e| {
            warn!(provider = %provider, "Rejected webhook: {}", e);
            e
        })?;
        let update = adapter.extract(&parsed).map_err(|e| {
            warn!(provider = %provider, event = %parsed.event, "Rejected webhook: {}", e);
            e
        })?;
        let event = parsed.event;
        let reference = update.merchant_reference.clone();
        debug!(
            provider = %provider,
            "{} ({}) for order {} -> {}",
            event, parsed.native_event, reference, update.canonical_status
        );

        let outcome = self.state_machine.apply(&reference, event, &update).await.map_err(|e| {
            error!(provider = %provider, "Failed to apply {} to order {}: {}", event, reference, e);
            e
        })?;

        let (outcome, notified) = match outcome {
            ApplyOutcome::Applied(order) => {
                let notified = match self.policy.notification_for(&update) {
                    Some((notice, message)) => match self.notifier.send(&message, &order.owner).await {
                        Ok(()) => true,
                        Err(e) => {
                            error!(provider = %provider, "{} notification for order {} failed: {}", notice, reference, e);
                            false
                        }
                    },
                    None => false,
                };
                (WebhookOutcome::Applied, notified)
            }
            ApplyOutcome::Ignored(IgnoreReason::Duplicate) => (WebhookOutcome::Duplicate, false),
            ApplyOutcome::Ignored(IgnoreReason::Stale) => (WebhookOutcome::Stale, false),
            ApplyOutcome::NotFound => {
                warn!(provider = %provider, "Webhook {} for unknown order {}", event, reference);
                let unmatched = UnmatchedWebhook {
                    provider,
                    merchant_reference: reference.clone(),
                    event,
                    status: update.canonical_status,
                    received_at: Utc::now(),
                };
                if let Err(e) = self.repository.record_unmatched(unmatched).await {
                    error!(provider = %provider, "Could not record unmatched webhook for {}: {}", reference, e);
                }
                (WebhookOutcome::OrderNotFound, false)
            }
        };

        info!(provider = %provider, "Webhook {} for order {}: {}", event, reference, outcome.as_str());
        Ok(WebhookAck {
            provider,
            event,
            merchant_reference: reference,
            outcome,
            notified,
        })
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

use crate::domain::{CanonicalStatus, Order, Provider, WebhookEvent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The stored order changed since it was read
    #[error("Order {merchant_reference} was modified concurrently (expected version {expected})")]
    Conflict { merchant_reference: String, expected: u64 },

    #[error("Order storage unavailable: {0}")]
    Unavailable(String),
}

/// A webhook for an order this system does not (yet) know about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedWebhook {
    pub provider: Provider,
    pub merchant_reference: String,
    pub event: WebhookEvent,
    pub status: CanonicalStatus,
    pub received_at: DateTime<Utc>,
}

/// Persistence for orders, owned by the checkout side of the system
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find(&self, merchant_reference: &str) -> Result<Option<Order>, RepositoryError>;

    /// Store `order` only if the stored copy still has `expected_version`
    async fn apply_transition(&self, expected_version: u64, order: Order) -> Result<Order, RepositoryError>;

    /// Keep a webhook that matched no order, for later reconciliation
    async fn record_unmatched(&self, webhook: UnmatchedWebhook) -> Result<(), RepositoryError>;
}

/// Process-local repository for development and tests
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
    unmatched: RwLock<Vec<UnmatchedWebhook>>,
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("order store lock poisoned".to_string())
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order the way checkout would. Replaces any order with the same reference.
    pub fn insert(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        orders.insert(order.merchant_reference.clone(), order);
        Ok(())
    }

    pub fn unmatched(&self) -> Result<Vec<UnmatchedWebhook>, RepositoryError> {
        Ok(self.unmatched.read().map_err(poisoned)?.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find(&self, merchant_reference: &str) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders.get(merchant_reference).cloned())
    }

    async fn apply_transition(&self, expected_version: u64, order: Order) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        let stored = orders
            .get_mut(&order.merchant_reference)
            .ok_or_else(|| RepositoryError::Unavailable(format!("order {} vanished", order.merchant_reference)))?;

        if stored.version != expected_version {
            return Err(RepositoryError::Conflict {
                merchant_reference: order.merchant_reference.clone(),
                expected: expected_version,
            });
        }

        *stored = order.clone();
        Ok(order)
    }

    async fn record_unmatched(&self, webhook: UnmatchedWebhook) -> Result<(), RepositoryError> {
        self.unmatched.write().map_err(poisoned)?.push(webhook);
        Ok(())
    }
}

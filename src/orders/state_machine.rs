use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{Order, Progress, StatusUpdate, WebhookEvent};
use crate::orders::repository::{OrderRepository, RepositoryError};

/// Why an update changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The order already has this status
    Duplicate,
    /// The order is already past this status
    Stale,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::Duplicate => "duplicate",
            IgnoreReason::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied(Order),
    Ignored(IgnoreReason),
    NotFound,
}

const MAX_CONFLICT_RETRIES: u32 = 5;

/// Sole writer of canonical order status and history
pub struct OrderStateMachine {
    repository: Arc<dyn OrderRepository>,
}

impl OrderStateMachine {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    /// Apply one status update idempotently.
    ///
    /// Forward moves are applied, redeliveries of the current status are recorded
    /// as duplicates, and anything behind the current status is dropped.
    pub async fn apply(
        &self,
        merchant_reference: &str,
        event: WebhookEvent,
        update: &StatusUpdate,
    ) -> Result<ApplyOutcome, RepositoryError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = match self.repository.find(merchant_reference).await? {
                Some(order) => order,
                None => return Ok(ApplyOutcome::NotFound),
            };
            let expected_version = order.version;

            let progress = order.progress_of(update.canonical_status);
            match progress {
                Progress::Stale => {
                    debug!(
                        "Ignoring stale {} for order {} (currently {})",
                        update.canonical_status, merchant_reference, order.status
                    );
                    return Ok(ApplyOutcome::Ignored(IgnoreReason::Stale));
                }
                Progress::Duplicate => order.record_duplicate(event, update),
                Progress::Forward => order.record_transition(event, update),
            }

            match self.repository.apply_transition(expected_version, order).await {
                Ok(stored) => {
                    return Ok(match progress {
                        Progress::Forward => {
                            info!(
                                "Order {} moved to {} on {}",
                                merchant_reference, update.canonical_status, event
                            );
                            ApplyOutcome::Applied(stored)
                        }
                        _ => {
                            debug!("Duplicate {} for order {}", event, merchant_reference);
                            ApplyOutcome::Ignored(IgnoreReason::Duplicate)
                        }
                    });
                }
                Err(RepositoryError::Conflict { .. }) if attempt < MAX_CONFLICT_RETRIES => {
                    warn!(
                        "Concurrent update on order {} (attempt {}), re-reading",
                        merchant_reference, attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CanonicalStatus;
    use crate::orders::repository::InMemoryOrderRepository;
    use chrono::Utc;

    fn update(status: CanonicalStatus) -> StatusUpdate {
        StatusUpdate {
            order_id: "ord_1".to_string(),
            merchant_reference: "REF-001".to_string(),
            canonical_status: status,
            timestamp: Utc::now(),
            tracking_number: None,
            tracking_url: None,
            issues: Vec::new(),
        }
    }

    fn setup() -> (Arc<InMemoryOrderRepository>, OrderStateMachine) {
        let repo = Arc::new(InMemoryOrderRepository::new());
        repo.insert(Order::new("REF-001", "reader@example.com")).unwrap();
        let machine = OrderStateMachine::new(repo.clone());
        (repo, machine)
    }

    #[tokio::test]
    async fn test_forward_transition_is_applied() {
        let (_, machine) = setup();
        let outcome = machine
            .apply("REF-001", WebhookEvent::OrderProcessing, &update(CanonicalStatus::Processing))
            .await
            .unwrap();

        match outcome {
            ApplyOutcome::Applied(order) => {
                assert_eq!(order.status, CanonicalStatus::Processing);
                assert_eq!(order.history.len(), 1);
            }
            other => panic!("Expected Applied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_update_twice_is_duplicate() {
        let (repo, machine) = setup();
        let processing = update(CanonicalStatus::Processing);

        let first = machine.apply("REF-001", WebhookEvent::OrderProcessing, &processing).await.unwrap();
        let second = machine.apply("REF-001", WebhookEvent::OrderProcessing, &processing).await.unwrap();

        assert!(matches!(first, ApplyOutcome::Applied(_)));
        assert_eq!(second, ApplyOutcome::Ignored(IgnoreReason::Duplicate));

        let order = repo.find("REF-001").await.unwrap().unwrap();
        assert_eq!(order.history.len(), 2);
        assert!(order.history[1].duplicate);
        assert_eq!(order.status, CanonicalStatus::Processing);
    }

    #[tokio::test]
    async fn test_out_of_order_update_is_stale() {
        let (repo, machine) = setup();
        machine
            .apply("REF-001", WebhookEvent::OrderComplete, &update(CanonicalStatus::Complete))
            .await
            .unwrap();

        let late = machine
            .apply("REF-001", WebhookEvent::OrderProcessing, &update(CanonicalStatus::Processing))
            .await
            .unwrap();
        assert_eq!(late, ApplyOutcome::Ignored(IgnoreReason::Stale));

        let cancel = machine
            .apply("REF-001", WebhookEvent::OrderCancelled, &update(CanonicalStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancel, ApplyOutcome::Ignored(IgnoreReason::Stale));

        let order = repo.find("REF-001").await.unwrap().unwrap();
        assert_eq!(order.status, CanonicalStatus::Complete);
        assert_eq!(order.history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_monotone_per_track() {
        let (repo, machine) = setup();
        let sequence = [
            (WebhookEvent::OrderSubmitted, CanonicalStatus::Submitted),
            (WebhookEvent::ShipmentCreated, CanonicalStatus::ShipmentCreated),
            (WebhookEvent::OrderCreated, CanonicalStatus::Created),
            (WebhookEvent::OrderProcessing, CanonicalStatus::Processing),
            (WebhookEvent::ShipmentDelivered, CanonicalStatus::ShipmentDelivered),
            (WebhookEvent::ShipmentShipped, CanonicalStatus::ShipmentShipped),
        ];
        for (event, status) in sequence {
            machine.apply("REF-001", event, &update(status)).await.unwrap();
        }

        let order = repo.find("REF-001").await.unwrap().unwrap();
        for track in [crate::domain::Track::Order, crate::domain::Track::Shipment] {
            let ranks: Vec<u8> = order
                .history
                .iter()
                .filter(|h| h.status.track() == track)
                .map(|h| h.status.rank())
                .collect();
            assert!(ranks.windows(2).all(|w| w[0] < w[1]), "{:?}", ranks);
        }
        assert_eq!(order.shipment_status, Some(CanonicalStatus::ShipmentDelivered));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (_, machine) = setup();
        let outcome = machine
            .apply("REF-404", WebhookEvent::OrderProcessing, &update(CanonicalStatus::Processing))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_apply_once() {
        let (repo, machine) = setup();
        let machine = Arc::new(machine);

        // Every task writes once, so each can lose at most tasks - 1 races
        let handles: Vec<_> = (0..MAX_CONFLICT_RETRIES)
            .map(|_| {
                let machine = machine.clone();
                tokio::spawn(async move {
                    machine
                        .apply("REF-001", WebhookEvent::OrderProcessing, &update(CanonicalStatus::Processing))
                        .await
                })
            })
            .collect();

        let (mut applied, mut duplicates) = (0, 0);
        for handle in handles {
            match handle.await.unwrap() {
                Ok(ApplyOutcome::Applied(_)) => applied += 1,
                Ok(ApplyOutcome::Ignored(IgnoreReason::Duplicate)) => duplicates += 1,
                other => panic!("Unexpected outcome {:?}", other),
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(duplicates, MAX_CONFLICT_RETRIES - 1);
        let order = repo.find("REF-001").await.unwrap().unwrap();
        assert_eq!(order.history.iter().filter(|h| !h.duplicate).count(), 1);
        assert_eq!(order.history.len() as u32, MAX_CONFLICT_RETRIES);
    }

    /// Repository whose first write always loses a race
    struct RacingRepository {
        inner: InMemoryOrderRepository,
        raced: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl OrderRepository for RacingRepository {
        async fn find(&self, merchant_reference: &str) -> Result<Option<Order>, RepositoryError> {
            self.inner.find(merchant_reference).await
        }

        async fn apply_transition(&self, expected_version: u64, order: Order) -> Result<Order, RepositoryError> {
            if !self.raced.swap(true, std::sync::atomic::Ordering::SeqCst) {
                // Another writer lands the same update first
                let mut winner = self.inner.find(&order.merchant_reference).await?.unwrap();
                winner.record_transition(WebhookEvent::OrderProcessing, &update(CanonicalStatus::Processing));
                self.inner.apply_transition(expected_version, winner).await?;
            }
            self.inner.apply_transition(expected_version, order).await
        }

        async fn record_unmatched(
            &self,
            webhook: crate::orders::repository::UnmatchedWebhook,
        ) -> Result<(), RepositoryError> {
            self.inner.record_unmatched(webhook).await
        }
    }

    #[tokio::test]
    async fn test_conflict_is_redecided() {
        let inner = InMemoryOrderRepository::new();
        inner.insert(Order::new("REF-001", "reader@example.com")).unwrap();
        let repo = Arc::new(RacingRepository {
            inner,
            raced: std::sync::atomic::AtomicBool::new(false),
        });
        let machine = OrderStateMachine::new(repo.clone());

        let outcome = machine
            .apply("REF-001", WebhookEvent::OrderProcessing, &update(CanonicalStatus::Processing))
            .await
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Ignored(IgnoreReason::Duplicate));
        let order = repo.find("REF-001").await.unwrap().unwrap();
        assert_eq!(order.history.len(), 2);
    }
}

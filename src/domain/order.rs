use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalStatus, Provider, StatusUpdate, Track, WebhookEvent};

/// One immutable line of an order's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: CanonicalStatus,
    pub timestamp: DateTime<Utc>,
    pub source_event: WebhookEvent,
    /// Redelivery of a status the order already had
    pub duplicate: bool,
}

/// How an incoming status relates to the order's current position on its track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Forward,
    Duplicate,
    Stale,
}

/// Print order as seen by the integration layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub merchant_reference: String,
    /// Notification recipient
    pub owner: String,
    pub provider: Option<Provider>,
    pub provider_order_id: Option<String>,
    pub status: CanonicalStatus,
    pub shipment_status: Option<CanonicalStatus>,
    pub history: Vec<HistoryEntry>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every stored change; used for compare-and-set writes
    pub version: u64,
}

impl Order {
    /// Create an order the way checkout does once a quote is accepted
    pub fn new(merchant_reference: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            merchant_reference: merchant_reference.into(),
            owner: owner.into(),
            provider: None,
            provider_order_id: None,
            status: CanonicalStatus::Created,
            shipment_status: None,
            history: Vec::new(),
            tracking_number: None,
            tracking_url: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Current status on the given track
    pub fn track_status(&self, track: Track) -> Option<CanonicalStatus> {
        match track {
            Track::Order => Some(self.status),
            Track::Shipment => self.shipment_status,
        }
    }

    /// Compare an incoming status with the current one on the same track
    pub fn progress_of(&self, incoming: CanonicalStatus) -> Progress {
        let current = match self.track_status(incoming.track()) {
            Some(current) => current,
            None => return Progress::Forward,
        };

        if current == incoming {
            Progress::Duplicate
        } else if current.is_terminal() || incoming.rank() <= current.rank() {
            Progress::Stale
        } else {
            Progress::Forward
        }
    }

    /// Move the order forward and append the history entry for it
    pub fn record_transition(&mut self, event: WebhookEvent, update: &StatusUpdate) {
        let status = update.canonical_status;
        match status.track() {
            Track::Order => self.status = status,
            Track::Shipment => self.shipment_status = Some(status),
        }
        if update.tracking_number.is_some() {
            self.tracking_number = update.tracking_number.clone();
        }
        if update.tracking_url.is_some() {
            self.tracking_url = update.tracking_url.clone();
        }
        if self.provider_order_id.is_none() && !update.order_id.is_empty() {
            self.provider_order_id = Some(update.order_id.clone());
        }
        self.push_history(event, update, false);
    }

    /// Append an audit entry for a redelivered status without changing state
    pub fn record_duplicate(&mut self, event: WebhookEvent, update: &StatusUpdate) {
        self.push_history(event, update, true);
    }

    fn push_history(&mut self, event: WebhookEvent, update: &StatusUpdate, duplicate: bool) {
        self.history.push(HistoryEntry {
            status: update.canonical_status,
            timestamp: update.timestamp,
            source_event: event,
            duplicate,
        });
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

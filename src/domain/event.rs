use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical webhook events accepted from any provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "order.created")]
    OrderCreated,
    #[serde(rename = "order.updated")]
    OrderUpdated,
    #[serde(rename = "order.submitted")]
    OrderSubmitted,
    #[serde(rename = "order.processing")]
    OrderProcessing,
    #[serde(rename = "order.complete")]
    OrderComplete,
    #[serde(rename = "order.cancelled")]
    OrderCancelled,
    #[serde(rename = "shipment.created")]
    ShipmentCreated,
    #[serde(rename = "shipment.shipped")]
    ShipmentShipped,
    #[serde(rename = "shipment.delivered")]
    ShipmentDelivered,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::OrderCreated => "order.created",
            WebhookEvent::OrderUpdated => "order.updated",
            WebhookEvent::OrderSubmitted => "order.submitted",
            WebhookEvent::OrderProcessing => "order.processing",
            WebhookEvent::OrderComplete => "order.complete",
            WebhookEvent::OrderCancelled => "order.cancelled",
            WebhookEvent::ShipmentCreated => "shipment.created",
            WebhookEvent::ShipmentShipped => "shipment.shipped",
            WebhookEvent::ShipmentDelivered => "shipment.delivered",
        }
    }

    pub fn track(&self) -> Track {
        match self {
            WebhookEvent::ShipmentCreated
            | WebhookEvent::ShipmentShipped
            | WebhookEvent::ShipmentDelivered => Track::Shipment,
            _ => Track::Order,
        }
    }

    /// Status the event names on its own, independent of the payload.
    ///
    /// `order.updated` carries no status of its own.
    pub fn implied_status(&self) -> Option<CanonicalStatus> {
        match self {
            WebhookEvent::OrderCreated => Some(CanonicalStatus::Created),
            WebhookEvent::OrderUpdated => None,
            WebhookEvent::OrderSubmitted => Some(CanonicalStatus::Submitted),
            WebhookEvent::OrderProcessing => Some(CanonicalStatus::Processing),
            WebhookEvent::OrderComplete => Some(CanonicalStatus::Complete),
            WebhookEvent::OrderCancelled => Some(CanonicalStatus::Cancelled),
            WebhookEvent::ShipmentCreated => Some(CanonicalStatus::ShipmentCreated),
            WebhookEvent::ShipmentShipped => Some(CanonicalStatus::ShipmentShipped),
            WebhookEvent::ShipmentDelivered => Some(CanonicalStatus::ShipmentDelivered),
        }
    }

    /// The event that announces a move to `status`
    pub fn announcing(status: CanonicalStatus) -> Self {
        match status {
            CanonicalStatus::Created => WebhookEvent::OrderCreated,
            CanonicalStatus::Submitted => WebhookEvent::OrderSubmitted,
            CanonicalStatus::Processing => WebhookEvent::OrderProcessing,
            CanonicalStatus::Complete => WebhookEvent::OrderComplete,
            CanonicalStatus::Cancelled => WebhookEvent::OrderCancelled,
            CanonicalStatus::ShipmentCreated => WebhookEvent::ShipmentCreated,
            CanonicalStatus::ShipmentShipped => WebhookEvent::ShipmentShipped,
            CanonicalStatus::ShipmentDelivered => WebhookEvent::ShipmentDelivered,
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two independent progressions recorded on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Order,
    Shipment,
}

/// Provider-independent order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Created,
    Submitted,
    Processing,
    Complete,
    Cancelled,
    ShipmentCreated,
    ShipmentShipped,
    ShipmentDelivered,
}

impl CanonicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Created => "created",
            CanonicalStatus::Submitted => "submitted",
            CanonicalStatus::Processing => "processing",
            CanonicalStatus::Complete => "complete",
            CanonicalStatus::Cancelled => "cancelled",
            CanonicalStatus::ShipmentCreated => "shipment_created",
            CanonicalStatus::ShipmentShipped => "shipment_shipped",
            CanonicalStatus::ShipmentDelivered => "shipment_delivered",
        }
    }

    pub fn track(&self) -> Track {
        match self {
            CanonicalStatus::ShipmentCreated
            | CanonicalStatus::ShipmentShipped
            | CanonicalStatus::ShipmentDelivered => Track::Shipment,
            _ => Track::Order,
        }
    }

    /// Position within the status's own track. Complete and Cancelled share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            CanonicalStatus::Created => 0,
            CanonicalStatus::Submitted => 1,
            CanonicalStatus::Processing => 2,
            CanonicalStatus::Complete | CanonicalStatus::Cancelled => 3,
            CanonicalStatus::ShipmentCreated => 0,
            CanonicalStatus::ShipmentShipped => 1,
            CanonicalStatus::ShipmentDelivered => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CanonicalStatus::Complete | CanonicalStatus::Cancelled | CanonicalStatus::ShipmentDelivered
        )
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised status report extracted from one inbound webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Provider-assigned order id
    pub order_id: String,
    pub merchant_reference: String,
    pub canonical_status: CanonicalStatus,
    pub timestamp: DateTime<Utc>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tracks() {
        assert_eq!(WebhookEvent::OrderProcessing.track(), Track::Order);
        assert_eq!(WebhookEvent::OrderUpdated.track(), Track::Order);
        assert_eq!(WebhookEvent::ShipmentCreated.track(), Track::Shipment);
        assert_eq!(WebhookEvent::ShipmentDelivered.track(), Track::Shipment);
    }

    #[test]
    fn test_implied_status_matches_event_track() {
        let events = [
            WebhookEvent::OrderCreated,
            WebhookEvent::OrderSubmitted,
            WebhookEvent::OrderProcessing,
            WebhookEvent::OrderComplete,
            WebhookEvent::OrderCancelled,
            WebhookEvent::ShipmentCreated,
            WebhookEvent::ShipmentShipped,
            WebhookEvent::ShipmentDelivered,
        ];
        for event in events {
            let status = event.implied_status().unwrap();
            assert_eq!(status.track(), event.track(), "track mismatch for {}", event);
            assert_eq!(WebhookEvent::announcing(status), event);
        }
        assert!(WebhookEvent::OrderUpdated.implied_status().is_none());
    }

    #[test]
    fn test_order_track_ranks_are_increasing() {
        assert!(CanonicalStatus::Created.rank() < CanonicalStatus::Submitted.rank());
        assert!(CanonicalStatus::Submitted.rank() < CanonicalStatus::Processing.rank());
        assert!(CanonicalStatus::Processing.rank() < CanonicalStatus::Complete.rank());
        assert_eq!(CanonicalStatus::Complete.rank(), CanonicalStatus::Cancelled.rank());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(CanonicalStatus::Complete.is_terminal());
        assert!(CanonicalStatus::Cancelled.is_terminal());
        assert!(CanonicalStatus::ShipmentDelivered.is_terminal());
        assert!(!CanonicalStatus::Processing.is_terminal());
        assert!(!CanonicalStatus::ShipmentShipped.is_terminal());
    }

    #[test]
    fn test_event_serializes_with_dotted_name() {
        let json = serde_json::to_string(&WebhookEvent::ShipmentShipped).unwrap();
        assert_eq!(json, "\"shipment.shipped\"");
    }
}

use crate::domain::{StatusUpdate, WebhookEvent};

/// Decides which transitions reach the customer and what they say
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationPolicy;

impl NotificationPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Internal bookkeeping events stay silent
    pub fn should_notify(&self, event: WebhookEvent) -> bool {
        match event {
            WebhookEvent::OrderSubmitted
            | WebhookEvent::OrderProcessing
            | WebhookEvent::OrderComplete
            | WebhookEvent::OrderCancelled
            | WebhookEvent::ShipmentShipped
            | WebhookEvent::ShipmentDelivered => true,
            WebhookEvent::OrderCreated | WebhookEvent::OrderUpdated | WebhookEvent::ShipmentCreated => false,
        }
    }

    /// Message for an applied update, if the customer should hear about it.
    ///
    /// The wording follows the status the order moved to, so an `order.updated`
    /// that completes an order reads the same as `order.complete`.
    pub fn notification_for(&self, update: &StatusUpdate) -> Option<(WebhookEvent, String)> {
        let event = WebhookEvent::announcing(update.canonical_status);
        self.should_notify(event)
            .then(|| (event, self.render_message(event, update)))
    }

    pub fn render_message(&self, event: WebhookEvent, update: &StatusUpdate) -> String {
        let reference = &update.merchant_reference;
        match event {
            WebhookEvent::OrderCreated => format!("Your print order {} has been created.", reference),
            WebhookEvent::OrderUpdated => {
                format!("Your print order {} is now {}.", reference, update.canonical_status)
            }
            WebhookEvent::OrderSubmitted => {
                format!("Your print order {} has been sent to the printer.", reference)
            }
            WebhookEvent::OrderProcessing => format!("Your print order {} is being printed.", reference),
            WebhookEvent::OrderComplete => {
                format!("Your print order {} has been printed and is ready to ship.", reference)
            }
            WebhookEvent::OrderCancelled => {
                let mut message = format!("Your print order {} has been cancelled.", reference);
                if !update.issues.is_empty() {
                    message.push_str(" Reason: ");
                    message.push_str(&update.issues.join("; "));
                    message.push('.');
                }
                message
            }
            WebhookEvent::ShipmentCreated => {
                format!("A shipment is being prepared for your print order {}.", reference)
            }
            WebhookEvent::ShipmentShipped => {
                let mut message = format!("Your print order {} has shipped.", reference);
                push_tracking(&mut message, update);
                message
            }
            WebhookEvent::ShipmentDelivered => {
                let mut message = format!("Your print order {} has been delivered.", reference);
                push_tracking(&mut message, update);
                message
            }
        }
    }
}

fn push_tracking(message: &mut String, update: &StatusUpdate) {
    if let Some(number) = &update.tracking_number {
        message.push_str(&format!(" Tracking number: {}", number));
        if let Some(url) = &update.tracking_url {
            message.push_str(&format!(" ({})", url));
        }
        message.push('.');
    } else if let Some(url) = &update.tracking_url {
        message.push_str(&format!(" Track it at {}.", url));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CanonicalStatus;
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

    #[test]
    fn test_customer_facing_events() {
        let policy = NotificationPolicy::new();
        assert!(policy.should_notify(WebhookEvent::OrderSubmitted));
        assert!(policy.should_notify(WebhookEvent::OrderCancelled));
        assert!(policy.should_notify(WebhookEvent::ShipmentShipped));
        assert!(policy.should_notify(WebhookEvent::ShipmentDelivered));
        assert!(!policy.should_notify(WebhookEvent::OrderCreated));
        assert!(!policy.should_notify(WebhookEvent::OrderUpdated));
        assert!(!policy.should_notify(WebhookEvent::ShipmentCreated));
    }

    #[test]
    fn test_notification_follows_applied_status() {
        let policy = NotificationPolicy::new();

        let (event, message) = policy.notification_for(&update(CanonicalStatus::Complete)).unwrap();
        assert_eq!(event, WebhookEvent::OrderComplete);
        assert_eq!(message, "Your print order REF-001 has been printed and is ready to ship.");

        assert!(policy.notification_for(&update(CanonicalStatus::Created)).is_none());
        assert!(policy.notification_for(&update(CanonicalStatus::ShipmentCreated)).is_none());
    }

    #[test]
    fn test_shipped_message_includes_tracking() {
        let mut shipped = update(CanonicalStatus::ShipmentShipped);
        shipped.tracking_number = Some("TRACK123".to_string());

        let message = NotificationPolicy::new().render_message(WebhookEvent::ShipmentShipped, &shipped);
        assert!(message.contains("REF-001"));
        assert!(message.contains("TRACK123"));
    }

    #[test]
    fn test_shipped_message_with_url() {
        let mut shipped = update(CanonicalStatus::ShipmentDelivered);
        shipped.tracking_number = Some("TRACK123".to_string());
        shipped.tracking_url = Some("https://track.example.com/TRACK123".to_string());

        let message = NotificationPolicy::new().render_message(WebhookEvent::ShipmentDelivered, &shipped);
        assert!(message.contains("https://track.example.com/TRACK123"));
    }

    #[test]
    fn test_shipped_message_without_tracking() {
        let message = NotificationPolicy::new()
            .render_message(WebhookEvent::ShipmentShipped, &update(CanonicalStatus::ShipmentShipped));
        assert_eq!(message, "Your print order REF-001 has shipped.");
    }

    #[test]
    fn test_cancelled_message_lists_issues() {
        let mut cancelled = update(CanonicalStatus::Cancelled);
        cancelled.issues = vec!["Image resolution too low".to_string(), "Address invalid".to_string()];

        let message = NotificationPolicy::new().render_message(WebhookEvent::OrderCancelled, &cancelled);
        assert!(message.contains("REF-001"));
        assert!(message.contains("Image resolution too low; Address invalid"));
    }

    #[test]
    fn test_every_message_names_the_order() {
        let policy = NotificationPolicy::new();
        let events = [
            WebhookEvent::OrderCreated,
            WebhookEvent::OrderUpdated,
            WebhookEvent::OrderSubmitted,
            WebhookEvent::OrderProcessing,
            WebhookEvent::OrderComplete,
            WebhookEvent::OrderCancelled,
            WebhookEvent::ShipmentCreated,
            WebhookEvent::ShipmentShipped,
            WebhookEvent::ShipmentDelivered,
        ];
        for event in events {
            let message = policy.render_message(event, &update(CanonicalStatus::Processing));
            assert!(message.contains("REF-001"), "{}: {}", event, message);
        }
    }
}

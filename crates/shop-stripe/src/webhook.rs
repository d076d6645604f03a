//! # Stripe Webhook Dispatch
//!
//! Routing for verified payment events. Webhooks are the out-of-band
//! confirmation channel: an intent abandoned mid-checkout can still
//! complete later, and the `payment_intent.succeeded` event is how the
//! store learns about it.

use shop_core::{PaymentEvent, PaymentEventKind, StoreResult};
use tracing::{debug, info, warn};

/// Webhook event handler trait
///
/// Implement this to react to payment events; unimplemented methods log.
#[allow(unused_variables)]
pub trait WebhookHandler: Send + Sync {
    /// Called when a payment intent succeeds
    fn on_payment_succeeded(&self, event: &PaymentEvent) -> StoreResult<()> {
        info!("Payment succeeded: {:?}", event.payment_ref);
        Ok(())
    }

    /// Called when a payment intent fails
    fn on_payment_failed(&self, event: &PaymentEvent) -> StoreResult<()> {
        warn!("Payment failed: {:?}", event.payment_ref);
        Ok(())
    }

    /// Called for unknown/unhandled events
    fn on_unknown_event(&self, event: &PaymentEvent) -> StoreResult<()> {
        debug!("Unhandled webhook event: {:?}", event.kind);
        Ok(())
    }
}

/// Default handler that just logs events
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a verified event to the appropriate handler method
pub fn dispatch_payment_event(
    handler: &dyn WebhookHandler,
    event: &PaymentEvent,
) -> StoreResult<()> {
    match &event.kind {
        PaymentEventKind::IntentSucceeded => handler.on_payment_succeeded(event),
        PaymentEventKind::IntentFailed => handler.on_payment_failed(event),
        PaymentEventKind::Unknown(_) => handler.on_unknown_event(event),
    }
}

/// Events to enable in the Stripe Dashboard for this store
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(kind: PaymentEventKind) -> PaymentEvent {
        PaymentEvent {
            event_id: "evt_test".to_string(),
            kind,
            provider: "stripe".to_string(),
            payment_ref: Some("pi_test".to_string()),
            amount_minor: Some(36632),
            raw: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_dispatch_routes_by_kind() {
        #[derive(Default)]
        struct CountingHandler {
            succeeded: AtomicUsize,
            failed: AtomicUsize,
            unknown: AtomicUsize,
        }

        impl WebhookHandler for CountingHandler {
            fn on_payment_succeeded(&self, _event: &PaymentEvent) -> StoreResult<()> {
                self.succeeded.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            fn on_payment_failed(&self, _event: &PaymentEvent) -> StoreResult<()> {
                self.failed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            fn on_unknown_event(&self, _event: &PaymentEvent) -> StoreResult<()> {
                self.unknown.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let handler = CountingHandler::default();
        dispatch_payment_event(&handler, &event(PaymentEventKind::IntentSucceeded)).unwrap();
        dispatch_payment_event(&handler, &event(PaymentEventKind::IntentFailed)).unwrap();
        dispatch_payment_event(
            &handler,
            &event(PaymentEventKind::Unknown("charge.refunded".to_string())),
        )
        .unwrap();

        assert_eq!(handler.succeeded.load(Ordering::SeqCst), 1);
        assert_eq!(handler.failed.load(Ordering::SeqCst), 1);
        assert_eq!(handler.unknown.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_logging_handler_accepts_all_events() {
        let handler = LoggingWebhookHandler;
        dispatch_payment_event(&handler, &event(PaymentEventKind::IntentSucceeded)).unwrap();
        dispatch_payment_event(&handler, &event(PaymentEventKind::IntentFailed)).unwrap();
    }
}

//! Downstream webhook event services.
//!
//! The webhook router verifies an event against the account whose endpoint
//! received it, then hands it to one of these services by event type. The
//! services themselves (member updates, emails, domain events) live outside
//! this crate.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::billing::StripeAccount;

use super::stripe_types::WebhookEvent;

/// Failure inside a downstream event service.
#[derive(Debug, Clone, Error)]
#[error("{service} failed to process event {event_id}: {message}")]
pub struct EventHandlingError {
    pub service: &'static str,
    pub event_id: String,
    pub message: String,
}

impl EventHandlingError {
    pub fn new(service: &'static str, event_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service,
            event_id: event_id.into(),
            message: message.into(),
        }
    }
}

/// Handles `customer.subscription.*` events.
#[async_trait]
pub trait SubscriptionEventHandler: Send + Sync {
    async fn handle_subscription_event(
        &self,
        account: StripeAccount,
        event: &WebhookEvent,
    ) -> Result<(), EventHandlingError>;
}

/// Handles `invoice.*` payment events.
#[async_trait]
pub trait InvoiceEventHandler: Send + Sync {
    async fn handle_invoice_event(
        &self,
        account: StripeAccount,
        event: &WebhookEvent,
    ) -> Result<(), EventHandlingError>;
}

/// Handles `checkout.session.completed`.
#[async_trait]
pub trait CheckoutSessionEventHandler: Send + Sync {
    async fn handle_checkout_session_event(
        &self,
        account: StripeAccount,
        event: &WebhookEvent,
    ) -> Result<(), EventHandlingError>;
}

//! Event services that log and record webhook events.
//!
//! Stand-ins for the member, invoice and checkout services when running the
//! binary on its own, and a recording target for tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::billing::StripeAccount;
use crate::ports::{
    CheckoutSessionEventHandler, EventHandlingError, InvoiceEventHandler,
    SubscriptionEventHandler, WebhookEvent,
};

/// One event seen by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub service: &'static str,
    pub account: StripeAccount,
    pub event_id: String,
    pub event_type: String,
}

/// Logs every event and keeps a copy.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventHandler {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().await.clone()
    }

    async fn record(&self, service: &'static str, account: StripeAccount, event: &WebhookEvent) {
        tracing::info!(
            service,
            account = %account,
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook event received"
        );
        self.events.lock().await.push(RecordedEvent {
            service,
            account,
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
        });
    }
}

#[async_trait]
impl SubscriptionEventHandler for RecordingEventHandler {
    async fn handle_subscription_event(
        &self,
        account: StripeAccount,
        event: &WebhookEvent,
    ) -> Result<(), EventHandlingError> {
        self.record("subscription", account, event).await;
        Ok(())
    }
}

#[async_trait]
impl InvoiceEventHandler for RecordingEventHandler {
    async fn handle_invoice_event(
        &self,
        account: StripeAccount,
        event: &WebhookEvent,
    ) -> Result<(), EventHandlingError> {
        self.record("invoice", account, event).await;
        Ok(())
    }
}

#[async_trait]
impl CheckoutSessionEventHandler for RecordingEventHandler {
    async fn handle_checkout_session_event(
        &self,
        account: StripeAccount,
        event: &WebhookEvent,
    ) -> Result<(), EventHandlingError> {
        self.record("checkout", account, event).await;
        Ok(())
    }
}

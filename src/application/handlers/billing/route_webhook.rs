//! RouteWebhookHandler - verifies an inbound Stripe webhook and dispatches it.
//!
//! The endpoint a webhook arrived on decides which account's secret verifies
//! it. There is no cross-account retry: a payload sent to the wrong endpoint
//! is rejected.

use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::adapters::stripe::DualStripeGateway;
use crate::domain::billing::{GatewayError, StripeAccount};
use crate::ports::{
    CheckoutSessionEventHandler, EventHandlingError, InvoiceEventHandler,
    SubscriptionEventHandler, WebhookEvent, WebhookEventKind,
};

/// Command to route one webhook delivery.
#[derive(Debug, Clone)]
pub struct RouteWebhookCommand {
    /// Account whose endpoint received the delivery.
    pub account: StripeAccount,
    /// Raw request body.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: String,
}

/// Which service an event was handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDispatch {
    Subscription,
    Invoice,
    CheckoutSession,
    /// Verified but not an event type we process.
    Ignored,
}

/// Errors from webhook routing.
#[derive(Debug, Clone, Error)]
pub enum WebhookRouteError {
    /// Verification failed or the account is not configured.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The downstream service failed; Stripe should retry.
    #[error(transparent)]
    Handler(#[from] EventHandlingError),
}

impl WebhookRouteError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookRouteError::Gateway(e) => e.status_code(),
            WebhookRouteError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookRouteError::Gateway(e) => e.error_code(),
            WebhookRouteError::Handler(_) => "WEBHOOK_HANDLER_FAILED",
        }
    }
}

/// Verifies webhooks per account and hands them to the event services.
pub struct RouteWebhookHandler {
    gateway: DualStripeGateway,
    subscriptions: Arc<dyn SubscriptionEventHandler>,
    invoices: Arc<dyn InvoiceEventHandler>,
    checkout_sessions: Arc<dyn CheckoutSessionEventHandler>,
}

impl RouteWebhookHandler {
    pub fn new(
        gateway: DualStripeGateway,
        subscriptions: Arc<dyn SubscriptionEventHandler>,
        invoices: Arc<dyn InvoiceEventHandler>,
        checkout_sessions: Arc<dyn CheckoutSessionEventHandler>,
    ) -> Self {
        Self {
            gateway,
            subscriptions,
            invoices,
            checkout_sessions,
        }
    }

    pub async fn handle(&self, cmd: RouteWebhookCommand) -> Result<WebhookDispatch, WebhookRouteError> {
        // 1. Verify with the receiving endpoint's account only
        let event = self.verify(&cmd).map_err(|e| {
            tracing::warn!(account = %cmd.account, error = %e, "Rejected Stripe webhook");
            e
        })?;

        // 2. Dispatch by event type
        self.dispatch(cmd.account, &event).await
    }

    fn verify(&self, cmd: &RouteWebhookCommand) -> Result<WebhookEvent, GatewayError> {
        match cmd.account {
            StripeAccount::Primary => self.gateway.parse_webhook(&cmd.payload, &cmd.signature),
            StripeAccount::Secondary => self
                .gateway
                .parse_secondary_webhook(&cmd.payload, &cmd.signature),
        }
    }

    async fn dispatch(
        &self,
        account: StripeAccount,
        event: &WebhookEvent,
    ) -> Result<WebhookDispatch, WebhookRouteError> {
        let dispatch = match event.kind() {
            WebhookEventKind::Subscription => {
                self.subscriptions
                    .handle_subscription_event(account, event)
                    .await?;
                WebhookDispatch::Subscription
            }
            WebhookEventKind::Invoice => {
                self.invoices.handle_invoice_event(account, event).await?;
                WebhookDispatch::Invoice
            }
            WebhookEventKind::CheckoutSession => {
                self.checkout_sessions
                    .handle_checkout_session_event(account, event)
                    .await?;
                WebhookDispatch::CheckoutSession
            }
            WebhookEventKind::Other => WebhookDispatch::Ignored,
        };

        tracing::debug!(
            account = %account,
            event_id = %event.id,
            event_type = %event.event_type,
            dispatch = ?dispatch,
            "Stripe webhook handled"
        );
        Ok(dispatch)
    }
}

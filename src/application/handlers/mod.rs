//! Application handlers.
//!
//! Command handlers that orchestrate the gateway and the downstream ports.

pub mod billing;

pub use billing::{
    CancelSubscriptionCommand, CancelSubscriptionError, CancelSubscriptionHandler,
    CancelSubscriptionResult, RouteWebhookCommand, RouteWebhookHandler, StripeService,
    WebhookDispatch, WebhookRegistration, WebhookRouteError,
};

//! Application layer - Command handlers.
//!
//! This layer orchestrates the dual gateway and coordinates between ports.

pub mod handlers;

pub use handlers::{
    CancelSubscriptionCommand, CancelSubscriptionError, CancelSubscriptionHandler,
    CancelSubscriptionResult, RouteWebhookCommand, RouteWebhookHandler, StripeService,
    WebhookDispatch, WebhookRegistration, WebhookRouteError,
};

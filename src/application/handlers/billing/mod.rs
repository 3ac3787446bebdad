//! Billing handlers.
//!
//! - `route_webhook` - verify webhooks per account and dispatch by event type
//! - `stripe_service` - configure, connect and disconnect the integration
//! - `cancel_subscription` - account-aware subscription cancellation

mod cancel_subscription;
mod route_webhook;
mod stripe_service;

pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionError, CancelSubscriptionHandler,
    CancelSubscriptionResult,
};
pub use route_webhook::{
    RouteWebhookCommand, RouteWebhookHandler, WebhookDispatch, WebhookRouteError,
};
pub use stripe_service::{StripeService, WebhookRegistration};

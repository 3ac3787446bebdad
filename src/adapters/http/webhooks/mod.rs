//! HTTP adapter for inbound Stripe webhooks.
//!
//! - `POST /members/webhooks/stripe/` - primary account deliveries
//! - `POST /members/webhooks/stripe/secondary/` - secondary account deliveries
//! - `GET /health` - gateway configuration state
//!
//! The path alone decides which account's secret verifies a delivery.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, GatewayStatusResponse, WebhookAckResponse};
pub use handlers::{WebhookApiError, WebhookAppState, STRIPE_SIGNATURE_HEADER};
pub use routes::{app_router, webhook_routes};

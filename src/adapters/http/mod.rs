//! HTTP adapters - REST API implementations.

pub mod webhooks;

// Re-export key types for convenience
pub use webhooks::{app_router, webhook_routes, WebhookAppState};

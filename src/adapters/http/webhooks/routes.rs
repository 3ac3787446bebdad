//! Axum router configuration for the Stripe webhook endpoints.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{
    gateway_status, handle_primary_webhook, handle_secondary_webhook, WebhookAppState,
};

/// Largest webhook body accepted. Stripe events are well below this.
const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

/// Create the Stripe webhook router.
///
/// # Routes
/// - `POST /members/webhooks/stripe/` - verified with the primary account's secret
/// - `POST /members/webhooks/stripe/secondary/` - verified with the secondary account's secret
///
/// The trailing slashes are part of the registered webhook URLs and must be kept.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new()
        .route("/members/webhooks/stripe/", post(handle_primary_webhook))
        .route(
            "/members/webhooks/stripe/secondary/",
            post(handle_secondary_webhook),
        )
}

/// Create the complete application router with middleware applied.
///
/// # Example
///
/// ```ignore
/// let state = WebhookAppState { router, gateway };
/// let app = app_router(state, Duration::from_secs(30));
/// axum::serve(listener, app).await?;
/// ```
pub fn app_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(gateway_status))
        .merge(webhook_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY_BYTES)),
        )
        .with_state(state)
}

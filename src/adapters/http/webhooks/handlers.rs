//! HTTP handlers for the Stripe webhook endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::adapters::stripe::DualStripeGateway;
use crate::application::{RouteWebhookCommand, RouteWebhookHandler, WebhookRouteError};
use crate::domain::billing::StripeAccount;

use super::dto::{ErrorResponse, GatewayStatusResponse, WebhookAckResponse};

/// Header Stripe signs deliveries with.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub router: Arc<RouteWebhookHandler>,
    pub gateway: DualStripeGateway,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /members/webhooks/stripe/ - primary account deliveries
pub async fn handle_primary_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    receive(&state, StripeAccount::Primary, &headers, body).await
}

/// POST /members/webhooks/stripe/secondary/ - secondary account deliveries
pub async fn handle_secondary_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    receive(&state, StripeAccount::Secondary, &headers, body).await
}

async fn receive(
    state: &WebhookAppState,
    account: StripeAccount,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookApiError::MissingSignature)?;

    let cmd = RouteWebhookCommand {
        account,
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let dispatch = state.router.handle(cmd).await?;
    Ok(Json(WebhookAckResponse::from(dispatch)))
}

/// GET /health - gateway configuration state
pub async fn gateway_status(State(state): State<WebhookAppState>) -> impl IntoResponse {
    let gateway_state = state.gateway.state();
    Json(GatewayStatusResponse {
        state: gateway_state,
        configured: gateway_state.is_configured(),
        test_env: state.gateway.test_env(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts routing errors to HTTP responses.
#[derive(Debug)]
pub enum WebhookApiError {
    MissingSignature,
    Route(WebhookRouteError),
}

impl From<WebhookRouteError> for WebhookApiError {
    fn from(err: WebhookRouteError) -> Self {
        Self::Route(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match &self {
            WebhookApiError::MissingSignature => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(
                    "MISSING_SIGNATURE",
                    format!("Missing {} header", STRIPE_SIGNATURE_HEADER),
                ),
            ),
            WebhookApiError::Route(e) => (
                e.status_code(),
                ErrorResponse::new(e.error_code(), e.to_string()),
            ),
        };
        (status, Json(error)).into_response()
    }
}

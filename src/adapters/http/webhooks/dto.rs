//! HTTP DTOs for the webhook and status endpoints.

use serde::Serialize;

use crate::application::WebhookDispatch;
use crate::domain::billing::GatewayState;

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to Stripe.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// Service the event was handed to, or `ignored`.
    pub dispatched_to: &'static str,
}

impl From<WebhookDispatch> for WebhookAckResponse {
    fn from(dispatch: WebhookDispatch) -> Self {
        let dispatched_to = match dispatch {
            WebhookDispatch::Subscription => "subscription",
            WebhookDispatch::Invoice => "invoice",
            WebhookDispatch::CheckoutSession => "checkout_session",
            WebhookDispatch::Ignored => "ignored",
        };
        Self {
            received: true,
            dispatched_to,
        }
    }
}

/// Gateway status for health checks.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatusResponse {
    pub state: GatewayState,
    pub configured: bool,
    pub test_env: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_names_dispatch_target() {
        let ack = WebhookAckResponse::from(WebhookDispatch::CheckoutSession);
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["received"], true);
        assert_eq!(json["dispatched_to"], "checkout_session");
    }

    #[test]
    fn status_serializes_state_in_snake_case() {
        let status = GatewayStatusResponse {
            state: GatewayState::PrimaryOnly,
            configured: true,
            test_env: false,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "primary_only");
    }
}

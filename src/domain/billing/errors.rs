//! Gateway error taxonomy.
//!
//! Configuration and not-found errors are distinct kinds so the HTTP layer can
//! map them to their own status codes.

use axum::http::StatusCode;
use thiserror::Error;

use super::account::StripeAccount;
use super::payment_error::PaymentError;

/// Errors surfaced by the account manager and the dual gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The account required for the operation is not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The resource was absent from every account that was attempted.
    #[error("{resource} {id} not found in any configured Stripe account")]
    NotFound { resource: &'static str, id: String },

    /// A client failure that is not interpreted as "not found".
    #[error("Stripe {account} account error: {source}")]
    Upstream {
        account: StripeAccount,
        #[source]
        source: PaymentError,
    },

    /// Signature mismatch or undecodable webhook payload.
    #[error("Invalid webhook for {account} account: {message}")]
    InvalidWebhook {
        account: StripeAccount,
        message: String,
    },
}

impl GatewayError {
    pub fn configuration(message: impl Into<String>) -> Self {
        GatewayError::Configuration(message.into())
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        GatewayError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn upstream(account: StripeAccount, source: PaymentError) -> Self {
        GatewayError::Upstream { account, source }
    }

    /// Error for an operation that needs an account that is not configured.
    pub fn account_not_configured(account: StripeAccount) -> Self {
        GatewayError::Configuration(format!("{} Stripe account is not configured", account))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, GatewayError::Configuration(_))
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::InvalidWebhook { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "STRIPE_NOT_CONFIGURED",
            GatewayError::NotFound { .. } => "STRIPE_RESOURCE_NOT_FOUND",
            GatewayError::InvalidWebhook { .. } => "INVALID_WEBHOOK",
            GatewayError::Upstream { .. } => "STRIPE_UPSTREAM_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_resource_and_id() {
        let err = GatewayError::not_found("Subscription", "sub_123");
        assert_eq!(
            err.to_string(),
            "Subscription sub_123 not found in any configured Stripe account"
        );
    }

    #[test]
    fn account_not_configured_names_account() {
        let err = GatewayError::account_not_configured(StripeAccount::Secondary);
        assert!(err.is_configuration());
        assert!(err.to_string().contains("secondary"));
    }

    #[test]
    fn status_codes_are_distinct_per_kind() {
        assert_eq!(
            GatewayError::configuration("x").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::not_found("Customer", "cus_1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::upstream(StripeAccount::Primary, PaymentError::network("down"))
                .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::InvalidWebhook {
                account: StripeAccount::Primary,
                message: "bad".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}

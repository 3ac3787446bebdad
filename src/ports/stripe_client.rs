//! Per-account Stripe client port.
//!
//! One `StripeClient` talks to exactly one Stripe account. The account label is
//! data on the client; primary and secondary clients are the same type.
//!
//! # Design
//!
//! - **Not found is an error**: lookups return `PaymentErrorCode::NotFound`
//!   rather than `Ok(None)`, matching Stripe's `resource_missing` responses
//! - **Timeouts are errors**: cancellation of an outbound call surfaces as a
//!   normal `PaymentError`
//! - **Own secret only**: `parse_webhook` verifies with the account's own
//!   webhook secret

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::billing::{AccountConfig, PaymentError, StripeAccount};

use super::stripe_types::{
    CheckoutSession, Coupon, CreateCheckoutSessionRequest, CreateCouponRequest,
    CreateCustomerRequest, CreatePriceRequest, CreateProductRequest, CreateSetupSessionRequest,
    CreateWebhookEndpointRequest, Customer, DeletedObject, List, ListOptions, Price, Product,
    Subscription, UpdateSubscriptionRequest, WebhookEndpoint, WebhookEvent,
};

/// Client for one Stripe account.
#[async_trait]
pub trait StripeClient: Send + Sync {
    /// The account this client talks to.
    fn account(&self) -> StripeAccount;

    /// Whether the client holds usable credentials.
    fn is_configured(&self) -> bool;

    /// Whether the client runs against Stripe test mode.
    fn test_env(&self) -> bool;

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, PaymentError>;

    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, PaymentError>;

    /// Cancel a subscription immediately.
    async fn cancel_subscription(&self, subscription_id: &str)
        -> Result<Subscription, PaymentError>;

    async fn update_subscription(
        &self,
        subscription_id: &str,
        request: UpdateSubscriptionRequest,
    ) -> Result<Subscription, PaymentError>;

    async fn get_price(&self, price_id: &str) -> Result<Price, PaymentError>;

    async fn create_price(&self, request: CreatePriceRequest) -> Result<Price, PaymentError>;

    async fn list_prices(&self, options: ListOptions) -> Result<List<Price>, PaymentError>;

    async fn get_product(&self, product_id: &str) -> Result<Product, PaymentError>;

    async fn create_product(&self, request: CreateProductRequest)
        -> Result<Product, PaymentError>;

    async fn list_products(&self, options: ListOptions) -> Result<List<Product>, PaymentError>;

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    async fn create_checkout_setup_session(
        &self,
        request: CreateSetupSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    async fn create_coupon(&self, request: CreateCouponRequest) -> Result<Coupon, PaymentError>;

    async fn create_webhook_endpoint(
        &self,
        request: CreateWebhookEndpointRequest,
    ) -> Result<WebhookEndpoint, PaymentError>;

    async fn delete_webhook_endpoint(&self, endpoint_id: &str)
        -> Result<DeletedObject, PaymentError>;

    /// Verify a webhook signature with this account's secret and decode the event.
    fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, PaymentError>;
}

/// Builds a configured client from one account's config.
pub trait StripeClientFactory: Send + Sync {
    fn build(&self, config: &AccountConfig) -> Result<Arc<dyn StripeClient>, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_client_is_object_safe() {
        fn _accepts_dyn(_client: &dyn StripeClient) {}
    }

    #[test]
    fn stripe_client_factory_is_object_safe() {
        fn _accepts_dyn(_factory: &dyn StripeClientFactory) {}
    }
}

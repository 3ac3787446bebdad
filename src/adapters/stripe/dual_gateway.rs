//! Dual-account Stripe gateway.
//!
//! A uniform surface over zero, one or two Stripe clients for callers that do
//! not care how many accounts exist.
//!
//! - Reads with fallback try primary, then secondary.
//! - Writes to existing resources discover the owning account first and then
//!   write there only.
//! - New resources are always created in the primary account.
//! - Webhook endpoints are managed per account.
//!
//! Every operation takes one snapshot of the client set and uses it
//! throughout, so a concurrent reconfiguration never mixes old and new
//! clients within one call.

use std::sync::Arc;

use crate::domain::billing::{
    AccountOutcome, AccountOutcomes, DualAccountConfig, GatewayError, GatewayState, Located,
    PaymentError, StripeAccount,
};
use crate::ports::{
    CheckoutSession, Coupon, CreateCheckoutSessionRequest, CreateCouponRequest,
    CreateCustomerRequest, CreatePriceRequest, CreateProductRequest, CreateSetupSessionRequest,
    CreateWebhookEndpointRequest, Customer, DeletedObject, List, ListOptions, Price, Product,
    StripeClient, StripeClientFactory, Subscription, UpdateSubscriptionRequest, WebhookEndpoint,
    WebhookEvent,
};

use super::client_slot::{AccountClients, ClientSlot};
use super::fallback::lookup_with_fallback;

/// Facade routing Stripe operations to the right account.
#[derive(Clone)]
pub struct DualStripeGateway {
    factory: Arc<dyn StripeClientFactory>,
    slot: ClientSlot,
}

impl DualStripeGateway {
    /// An unconfigured gateway with its own client slot.
    pub fn new(factory: Arc<dyn StripeClientFactory>) -> Self {
        Self::with_slot(factory, ClientSlot::new())
    }

    pub fn with_slot(factory: Arc<dyn StripeClientFactory>, slot: ClientSlot) -> Self {
        Self { factory, slot }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ════════════════════════════════════════════════════════════════════════════

    /// Replaces both clients. `None` leaves the gateway unconfigured.
    pub fn configure(&self, config: Option<&DualAccountConfig>) -> Result<GatewayState, GatewayError> {
        let Some(config) = config else {
            self.slot.clear();
            tracing::info!("Stripe gateway unconfigured");
            return Ok(GatewayState::Unconfigured);
        };

        let clients = self.build_clients(config);

        match clients {
            Ok(clients) => {
                let state = clients.state();
                self.slot.replace(clients);
                tracing::info!(state = ?state, "Stripe gateway configured");
                Ok(state)
            }
            Err(e) => {
                self.slot.clear();
                Err(e)
            }
        }
    }

    fn build_clients(&self, config: &DualAccountConfig) -> Result<AccountClients, GatewayError> {
        let build = |account: StripeAccount| {
            config
                .get(account)
                .map(|account_config| {
                    let account_config = account_config.clone().for_account(account);
                    self.factory.build(&account_config).map_err(|e| {
                        tracing::error!(account = %account, error = %e, "Failed to build Stripe client");
                        GatewayError::upstream(account, e)
                    })
                })
                .transpose()
        };

        let primary = build(StripeAccount::Primary)?;
        let secondary = build(StripeAccount::Secondary)?;
        Ok(AccountClients::new(primary, secondary))
    }

    pub fn disconnect(&self) {
        self.slot.clear();
    }

    pub fn configured(&self) -> bool {
        self.state().is_configured()
    }

    pub fn primary_configured(&self) -> bool {
        self.slot.snapshot().configured(StripeAccount::Primary).is_some()
    }

    pub fn secondary_configured(&self) -> bool {
        self.slot
            .snapshot()
            .configured(StripeAccount::Secondary)
            .is_some()
    }

    pub fn state(&self) -> GatewayState {
        self.slot.snapshot().state()
    }

    /// Whether the primary account runs in Stripe test mode.
    pub fn test_env(&self) -> bool {
        self.slot
            .snapshot()
            .configured(StripeAccount::Primary)
            .map(|client| client.test_env())
            .unwrap_or(false)
    }

    fn require(
        clients: &AccountClients,
        account: StripeAccount,
    ) -> Result<Arc<dyn StripeClient>, GatewayError> {
        clients
            .configured(account)
            .cloned()
            .ok_or_else(|| GatewayError::account_not_configured(account))
    }

    fn primary(&self) -> Result<Arc<dyn StripeClient>, GatewayError> {
        Self::require(&self.slot.snapshot(), StripeAccount::Primary)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reads with fallback
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Located<Subscription>, GatewayError> {
        let clients = self.slot.snapshot();
        Self::find_subscription(&clients, subscription_id).await
    }

    pub async fn get_customer(&self, customer_id: &str) -> Result<Located<Customer>, GatewayError> {
        let clients = self.slot.snapshot();
        lookup_with_fallback(&clients, "Customer", customer_id, |client| async move {
            client.get_customer(customer_id).await
        })
        .await
        .into_found()
        .ok_or_else(|| GatewayError::not_found("Customer", customer_id))
    }

    async fn find_subscription(
        clients: &AccountClients,
        subscription_id: &str,
    ) -> Result<Located<Subscription>, GatewayError> {
        lookup_with_fallback(clients, "Subscription", subscription_id, |client| async move {
            client.get_subscription(subscription_id).await
        })
        .await
        .into_found()
        .ok_or_else(|| GatewayError::not_found("Subscription", subscription_id))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Writes to discovered account
    // ════════════════════════════════════════════════════════════════════════════

    /// Cancels the subscription in the account that holds it.
    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Located<Subscription>, GatewayError> {
        let clients = self.slot.snapshot();
        let account = Self::find_subscription(&clients, subscription_id).await?.account;
        let client = Self::require(&clients, account)?;

        let cancelled = client
            .cancel_subscription(subscription_id)
            .await
            .map_err(|e| write_failed("cancel_subscription", account, subscription_id, e))?;

        tracing::info!(account = %account, subscription_id, "Cancelled subscription");
        Ok(Located::new(cancelled, account))
    }

    /// Updates the subscription in the account that holds it.
    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        request: UpdateSubscriptionRequest,
    ) -> Result<Located<Subscription>, GatewayError> {
        let clients = self.slot.snapshot();
        let account = Self::find_subscription(&clients, subscription_id).await?.account;
        let client = Self::require(&clients, account)?;

        let updated = client
            .update_subscription(subscription_id, request)
            .await
            .map_err(|e| write_failed("update_subscription", account, subscription_id, e))?;

        Ok(Located::new(updated, account))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Primary-only creation
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn create_customer(&self, request: CreateCustomerRequest) -> Result<Customer, GatewayError> {
        self.primary()?
            .create_customer(request)
            .await
            .map_err(|e| GatewayError::upstream(StripeAccount::Primary, e))
    }

    pub async fn create_price(&self, request: CreatePriceRequest) -> Result<Price, GatewayError> {
        self.primary()?
            .create_price(request)
            .await
            .map_err(|e| GatewayError::upstream(StripeAccount::Primary, e))
    }

    pub async fn create_product(&self, request: CreateProductRequest) -> Result<Product, GatewayError> {
        self.primary()?
            .create_product(request)
            .await
            .map_err(|e| GatewayError::upstream(StripeAccount::Primary, e))
    }

    pub async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.primary()?
            .create_checkout_session(request)
            .await
            .map_err(|e| GatewayError::upstream(StripeAccount::Primary, e))
    }

    pub async fn create_checkout_setup_session(
        &self,
        request: CreateSetupSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.primary()?
            .create_checkout_setup_session(request)
            .await
            .map_err(|e| GatewayError::upstream(StripeAccount::Primary, e))
    }

    pub async fn create_coupon(&self, request: CreateCouponRequest) -> Result<Coupon, GatewayError> {
        self.primary()?
            .create_coupon(request)
            .await
            .map_err(|e| GatewayError::upstream(StripeAccount::Primary, e))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Webhook endpoints
    // ════════════════════════════════════════════════════════════════════════════

    /// Registers the endpoint in every configured account.
    ///
    /// Unconfigured accounts are left out of the result; a failure in one
    /// account is reported in its entry and does not stop the other.
    pub async fn create_webhook_endpoint(
        &self,
        request: CreateWebhookEndpointRequest,
    ) -> AccountOutcomes<WebhookEndpoint> {
        let mut outcomes = AccountOutcomes::new();
        for (account, client) in self.slot.snapshot().all() {
            let result = client.create_webhook_endpoint(request.clone()).await;
            if let Err(e) = &result {
                tracing::error!(account = %account, error = %e, "Failed to create webhook endpoint");
            }
            outcomes.insert(account, AccountOutcome::from_result(result));
        }
        outcomes
    }

    /// Deletes a webhook endpoint.
    ///
    /// With an explicit account, deletes only there and fails if that account
    /// is not configured or the delete fails. Without one, attempts every
    /// configured account and records each outcome, failures included.
    pub async fn delete_webhook_endpoint(
        &self,
        endpoint_id: &str,
        account: Option<StripeAccount>,
    ) -> Result<AccountOutcomes<DeletedObject>, GatewayError> {
        let clients = self.slot.snapshot();

        if let Some(account) = account {
            let deleted = Self::require(&clients, account)?
                .delete_webhook_endpoint(endpoint_id)
                .await
                .map_err(|e| write_failed("delete_webhook_endpoint", account, endpoint_id, e))?;
            return Ok(AccountOutcomes::from([(
                account,
                AccountOutcome::Succeeded { result: deleted },
            )]));
        }

        let mut outcomes = AccountOutcomes::new();
        for (account, client) in clients.all() {
            let result = client.delete_webhook_endpoint(endpoint_id).await;
            if let Err(e) = &result {
                tracing::warn!(
                    account = %account,
                    endpoint_id,
                    error = %e,
                    "Failed to delete webhook endpoint"
                );
            }
            outcomes.insert(account, AccountOutcome::from_result(result));
        }
        Ok(outcomes)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Account-parameterized reads
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn get_price(&self, price_id: &str, account: StripeAccount) -> Result<Price, GatewayError> {
        Self::require(&self.slot.snapshot(), account)?
            .get_price(price_id)
            .await
            .map_err(|e| read_failed("Price", price_id, account, e))
    }

    pub async fn get_product(
        &self,
        product_id: &str,
        account: StripeAccount,
    ) -> Result<Product, GatewayError> {
        Self::require(&self.slot.snapshot(), account)?
            .get_product(product_id)
            .await
            .map_err(|e| read_failed("Product", product_id, account, e))
    }

    pub async fn list_prices(
        &self,
        options: ListOptions,
        account: StripeAccount,
    ) -> Result<List<Price>, GatewayError> {
        Self::require(&self.slot.snapshot(), account)?
            .list_prices(options)
            .await
            .map_err(|e| GatewayError::upstream(account, e))
    }

    pub async fn list_products(
        &self,
        options: ListOptions,
        account: StripeAccount,
    ) -> Result<List<Product>, GatewayError> {
        Self::require(&self.slot.snapshot(), account)?
            .list_products(options)
            .await
            .map_err(|e| GatewayError::upstream(account, e))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Webhook verification
    // ════════════════════════════════════════════════════════════════════════════

    /// Verifies a webhook delivered to the primary endpoint.
    pub fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, GatewayError> {
        self.parse_for(StripeAccount::Primary, payload, signature)
    }

    /// Verifies a webhook delivered to the secondary endpoint.
    pub fn parse_secondary_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, GatewayError> {
        self.parse_for(StripeAccount::Secondary, payload, signature)
    }

    fn parse_for(
        &self,
        account: StripeAccount,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, GatewayError> {
        Self::require(&self.slot.snapshot(), account)?
            .parse_webhook(payload, signature)
            .map_err(|e| GatewayError::InvalidWebhook {
                account,
                message: e.message,
            })
    }
}

fn write_failed(
    operation: &'static str,
    account: StripeAccount,
    id: &str,
    error: PaymentError,
) -> GatewayError {
    tracing::error!(account = %account, operation, id, error = %error, "Stripe write failed");
    GatewayError::upstream(account, error)
}

fn read_failed(
    resource: &'static str,
    id: &str,
    account: StripeAccount,
    error: PaymentError,
) -> GatewayError {
    if error.is_not_found() {
        GatewayError::not_found(resource, id)
    } else {
        GatewayError::upstream(account, error)
    }
}

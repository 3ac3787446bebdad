//! Mock Stripe client for testing.
//!
//! Provides a configurable mock implementation of `StripeClient` for unit
//! and integration tests. Supports:
//! - Pre-seeded customers, subscriptions, prices and products
//! - Error injection per method
//! - Call tracking
//! - Webhook verification with a real signing secret

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::billing::{AccountConfig, PaymentError, StripeAccount};
use crate::ports::{
    CheckoutSession, Coupon, CreateCheckoutSessionRequest, CreateCouponRequest,
    CreateCustomerRequest, CreatePriceRequest, CreateProductRequest, CreateSetupSessionRequest,
    CreateWebhookEndpointRequest, Customer, DeletedObject, List, ListOptions, Price, Product,
    Recurring, StripeClient, StripeClientFactory, Subscription, SubscriptionItems,
    SubscriptionStatus, UpdateSubscriptionRequest, WebhookEndpoint, WebhookEvent,
};

use super::webhook_signature::WebhookVerifier;

/// Mock Stripe client for one account.
///
/// Clones share state, so a test can keep a handle while the gateway holds
/// another.
///
/// # Example
///
/// ```ignore
/// let secondary = MockStripeClient::new(StripeAccount::Secondary);
/// secondary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));
///
/// let result = secondary.get_subscription("sub_1").await;
/// assert_eq!(secondary.call_count("get_subscription"), 1);
/// ```
#[derive(Clone)]
pub struct MockStripeClient {
    account: StripeAccount,
    inner: Arc<Mutex<MockState>>,
    journal: CallJournal,
}

/// Call log shared by several mocks, in the order the calls were made.
type CallJournal = Arc<Mutex<Vec<MethodCall>>>;

#[derive(Default)]
struct MockState {
    configured: bool,
    test_env: bool,
    customers: HashMap<String, Customer>,
    subscriptions: HashMap<String, Subscription>,
    prices: HashMap<String, Price>,
    products: HashMap<String, Product>,
    webhook_endpoints: HashMap<String, WebhookEndpoint>,
    method_errors: HashMap<String, PaymentError>,
    call_log: Vec<MethodCall>,
    webhook_secret: Option<String>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub account: StripeAccount,
    pub method: String,
    pub args: Vec<String>,
}

impl MockStripeClient {
    /// A configured test-mode client.
    pub fn new(account: StripeAccount) -> Self {
        Self::with_journal(account, CallJournal::default())
    }

    /// A configured test-mode client that also appends its calls to `journal`.
    fn with_journal(account: StripeAccount, journal: CallJournal) -> Self {
        Self {
            account,
            inner: Arc::new(Mutex::new(MockState {
                configured: true,
                test_env: true,
                ..Default::default()
            })),
            journal,
        }
    }

    /// A client that reports itself as not configured.
    pub fn unconfigured(account: StripeAccount) -> Self {
        let mock = Self::new(account);
        mock.set_configured(false);
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn set_configured(&self, configured: bool) {
        self.state().configured = configured;
    }

    pub fn set_test_env(&self, test_env: bool) {
        self.state().test_env = test_env;
    }

    pub fn add_customer(&self, customer: Customer) {
        self.state().customers.insert(customer.id.clone(), customer);
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn add_price(&self, price: Price) {
        self.state().prices.insert(price.id.clone(), price);
    }

    pub fn add_product(&self, product: Product) {
        self.state().products.insert(product.id.clone(), product);
    }

    pub fn add_webhook_endpoint(&self, endpoint: WebhookEndpoint) {
        self.state()
            .webhook_endpoints
            .insert(endpoint.id.clone(), endpoint);
    }

    /// Verify webhooks with this signing secret.
    pub fn set_webhook_secret(&self, secret: impl Into<String>) {
        self.state().webhook_secret = Some(secret.into());
    }

    /// Fail every call to `method` with `error`.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    pub fn subscription_status(&self, subscription_id: &str) -> Option<SubscriptionStatus> {
        self.state()
            .subscriptions
            .get(subscription_id)
            .map(|s| s.status)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    pub fn customer(id: &str, email: &str) -> Customer {
        Customer {
            id: id.to_string(),
            email: Some(email.to_string()),
            name: None,
            created: 1_704_067_200,
            metadata: HashMap::new(),
            deleted: false,
        }
    }

    pub fn subscription(id: &str, customer_id: &str) -> Subscription {
        Subscription {
            id: id.to_string(),
            customer: customer_id.to_string(),
            status: SubscriptionStatus::Active,
            current_period_start: 1_704_067_200,
            current_period_end: 1_706_745_600,
            cancel_at_period_end: false,
            canceled_at: None,
            metadata: HashMap::new(),
            items: SubscriptionItems::default(),
        }
    }

    pub fn price(id: &str, product: &str) -> Price {
        Price {
            id: id.to_string(),
            product: Some(product.to_string()),
            unit_amount: Some(500),
            currency: "usd".to_string(),
            recurring: Some(Recurring {
                interval: "month".to_string(),
                interval_count: 1,
            }),
            active: true,
            nickname: None,
        }
    }

    pub fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            active: true,
            description: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn begin(&self, method: &str, args: Vec<String>) -> Result<MutexGuard<'_, MockState>, PaymentError> {
        let call = MethodCall {
            account: self.account,
            method: method.to_string(),
            args,
        };
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call.clone());

        let mut state = self.state();
        state.call_log.push(call);
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if !state.configured {
            return Err(PaymentError::not_configured());
        }
        Ok(state)
    }
}

fn mock_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_mock_{}", prefix, &suffix[..8])
}

#[async_trait]
impl StripeClient for MockStripeClient {
    fn account(&self) -> StripeAccount {
        self.account
    }

    fn is_configured(&self) -> bool {
        self.state().configured
    }

    fn test_env(&self) -> bool {
        self.state().test_env
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, PaymentError> {
        let state = self.begin("get_customer", vec![customer_id.to_string()])?;
        state
            .customers
            .get(customer_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Customer", customer_id))
    }

    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<Customer, PaymentError> {
        let mut state = self.begin("create_customer", vec![request.email.clone()])?;
        let customer = Customer {
            id: mock_id("cus"),
            email: Some(request.email),
            name: request.name,
            created: chrono::Utc::now().timestamp(),
            metadata: request.metadata,
            deleted: false,
        };
        state.customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, PaymentError> {
        let state = self.begin("get_subscription", vec![subscription_id.to_string()])?;
        state
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Subscription", subscription_id))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<Subscription, PaymentError> {
        let mut state = self.begin("cancel_subscription", vec![subscription_id.to_string()])?;
        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| PaymentError::not_found("Subscription", subscription_id))?;
        subscription.status = SubscriptionStatus::Canceled;
        subscription.canceled_at = Some(chrono::Utc::now().timestamp());
        Ok(subscription.clone())
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        request: UpdateSubscriptionRequest,
    ) -> Result<Subscription, PaymentError> {
        let mut state = self.begin(
            "update_subscription",
            vec![subscription_id.to_string(), format!("{:?}", request.cancel_at_period_end)],
        )?;
        let price = request
            .price_id
            .as_ref()
            .and_then(|id| state.prices.get(id).cloned());
        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| PaymentError::not_found("Subscription", subscription_id))?;
        if let Some(cancel) = request.cancel_at_period_end {
            subscription.cancel_at_period_end = cancel;
        }
        if let (Some(price), Some(item)) = (price, subscription.items.data.first_mut()) {
            item.price = price;
        }
        subscription.metadata.extend(request.metadata);
        Ok(subscription.clone())
    }

    async fn get_price(&self, price_id: &str) -> Result<Price, PaymentError> {
        let state = self.begin("get_price", vec![price_id.to_string()])?;
        state
            .prices
            .get(price_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Price", price_id))
    }

    async fn create_price(&self, request: CreatePriceRequest) -> Result<Price, PaymentError> {
        let mut state = self.begin("create_price", vec![request.product.clone()])?;
        let price = Price {
            id: mock_id("price"),
            product: Some(request.product),
            unit_amount: Some(request.unit_amount),
            currency: request.currency,
            recurring: request.interval.map(|interval| Recurring {
                interval,
                interval_count: 1,
            }),
            active: request.active,
            nickname: request.nickname,
        };
        state.prices.insert(price.id.clone(), price.clone());
        Ok(price)
    }

    async fn list_prices(&self, options: ListOptions) -> Result<List<Price>, PaymentError> {
        let state = self.begin("list_prices", vec![format!("{:?}", options.limit)])?;
        let mut data: Vec<Price> = state
            .prices
            .values()
            .filter(|p| options.active.map_or(true, |active| p.active == active))
            .cloned()
            .collect();
        data.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(List {
            data,
            has_more: false,
        })
    }

    async fn get_product(&self, product_id: &str) -> Result<Product, PaymentError> {
        let state = self.begin("get_product", vec![product_id.to_string()])?;
        state
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Product", product_id))
    }

    async fn create_product(&self, request: CreateProductRequest) -> Result<Product, PaymentError> {
        let mut state = self.begin("create_product", vec![request.name.clone()])?;
        let product = Product {
            id: mock_id("prod"),
            name: request.name,
            active: true,
            description: request.description,
        };
        state.products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn list_products(&self, options: ListOptions) -> Result<List<Product>, PaymentError> {
        let state = self.begin("list_products", vec![format!("{:?}", options.limit)])?;
        let mut data: Vec<Product> = state
            .products
            .values()
            .filter(|p| options.active.map_or(true, |active| p.active == active))
            .cloned()
            .collect();
        data.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(List {
            data,
            has_more: false,
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let _state = self.begin("create_checkout_session", vec![request.price_id.clone()])?;
        let id = mock_id("cs");
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
            id,
            mode: "subscription".to_string(),
            customer: request.customer_id,
            subscription: None,
            metadata: request.metadata,
        })
    }

    async fn create_checkout_setup_session(
        &self,
        request: CreateSetupSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let _state = self.begin(
            "create_checkout_setup_session",
            vec![request.customer_id.clone()],
        )?;
        let id = mock_id("cs");
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
            id,
            mode: "setup".to_string(),
            customer: Some(request.customer_id),
            subscription: request.subscription_id,
            metadata: HashMap::new(),
        })
    }

    async fn create_coupon(&self, request: CreateCouponRequest) -> Result<Coupon, PaymentError> {
        let _state = self.begin("create_coupon", vec![request.duration.clone()])?;
        Ok(Coupon {
            id: mock_id("coupon"),
            name: request.name,
            percent_off: request.percent_off,
            amount_off: request.amount_off,
            currency: request.currency,
            duration: request.duration,
            duration_in_months: request.duration_in_months,
        })
    }

    async fn create_webhook_endpoint(
        &self,
        request: CreateWebhookEndpointRequest,
    ) -> Result<WebhookEndpoint, PaymentError> {
        let mut state = self.begin("create_webhook_endpoint", vec![request.url.clone()])?;
        let endpoint = WebhookEndpoint {
            id: mock_id("we"),
            url: request.url,
            secret: Some(format!("whsec_mock_{}", self.account)),
            enabled_events: request.enabled_events,
        };
        state
            .webhook_endpoints
            .insert(endpoint.id.clone(), endpoint.clone());
        Ok(endpoint)
    }

    async fn delete_webhook_endpoint(&self, endpoint_id: &str) -> Result<DeletedObject, PaymentError> {
        let mut state = self.begin("delete_webhook_endpoint", vec![endpoint_id.to_string()])?;
        state
            .webhook_endpoints
            .remove(endpoint_id)
            .map(|endpoint| DeletedObject {
                id: endpoint.id,
                deleted: true,
            })
            .ok_or_else(|| PaymentError::not_found("WebhookEndpoint", endpoint_id))
    }

    fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, PaymentError> {
        let state = self.begin("parse_webhook", vec![signature.to_string()])?;
        let secret = state.webhook_secret.clone().unwrap_or_default();
        drop(state);
        WebhookVerifier::new(self.account, SecretString::new(secret)).verify(payload, signature)
    }
}

/// Factory handing out pre-built mocks, one per account.
///
/// The mock returned for an account reflects the config it was built from:
/// a config without keys yields an unconfigured client, and a config with a
/// webhook secret verifies webhooks with it.
#[derive(Clone)]
pub struct MockStripeClientFactory {
    primary: MockStripeClient,
    secondary: MockStripeClient,
    journal: CallJournal,
    failures: Arc<Mutex<HashMap<StripeAccount, PaymentError>>>,
    builds: Arc<Mutex<Vec<StripeAccount>>>,
}

impl MockStripeClientFactory {
    pub fn new() -> Self {
        let journal = CallJournal::default();
        Self {
            primary: MockStripeClient::with_journal(StripeAccount::Primary, journal.clone()),
            secondary: MockStripeClient::with_journal(StripeAccount::Secondary, journal.clone()),
            journal,
            failures: Arc::new(Mutex::new(HashMap::new())),
            builds: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle onto the mock served for `account`.
    pub fn client(&self, account: StripeAccount) -> MockStripeClient {
        match account {
            StripeAccount::Primary => self.primary.clone(),
            StripeAccount::Secondary => self.secondary.clone(),
        }
    }

    /// Make `build` fail for `account`.
    pub fn fail_builds_for(&self, account: StripeAccount, error: PaymentError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(account, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Calls made to either account's mock, in call order.
    pub fn journal(&self) -> Vec<MethodCall> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Accounts built so far, in build order.
    pub fn builds(&self) -> Vec<StripeAccount> {
        self.builds.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockStripeClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl StripeClientFactory for MockStripeClientFactory {
    fn build(&self, config: &AccountConfig) -> Result<Arc<dyn StripeClient>, PaymentError> {
        let account = config.account();
        if let Some(error) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&account)
        {
            return Err(error.clone());
        }
        self.builds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(account);

        let client = self.client(account);
        client.set_configured(config.has_keys());
        client.set_test_env(config.test_env());
        let secret = config.webhook_secret().expose_secret();
        if !secret.is_empty() {
            client.set_webhook_secret(secret.clone());
        }
        Ok(Arc::new(client))
    }
}

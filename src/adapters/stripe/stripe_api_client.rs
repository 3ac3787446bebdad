//! Stripe API client for one account.
//!
//! The same type serves the primary and the secondary account; the account
//! label is carried by its `AccountConfig`.
//!
//! # Configuration
//!
//! ```ignore
//! let factory = HttpStripeClientFactory::new("https://api.stripe.com");
//! let client = factory.build(&account_config)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::billing::{AccountConfig, PaymentError, PaymentErrorCode, StripeAccount};
use crate::ports::{
    CheckoutSession, Coupon, CreateCheckoutSessionRequest, CreateCouponRequest,
    CreateCustomerRequest, CreatePriceRequest, CreateProductRequest, CreateSetupSessionRequest,
    CreateWebhookEndpointRequest, Customer, DeletedObject, List, ListOptions, Price, Product,
    StripeClient, StripeClientFactory, Subscription, UpdateSubscriptionRequest, WebhookEndpoint,
    WebhookEvent,
};

use super::webhook_signature::WebhookVerifier;

/// Default Stripe API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API version pinned for every request.
pub const STRIPE_API_VERSION: &str = "2020-08-27";

type Params = Vec<(String, String)>;

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Stripe's error envelope.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// reqwest-backed client bound to one Stripe account.
pub struct StripeApiClient {
    config: AccountConfig,
    http_client: reqwest::Client,
    api_base_url: String,
    verifier: WebhookVerifier,
}

impl StripeApiClient {
    pub fn new(
        config: AccountConfig,
        http_client: reqwest::Client,
        api_base_url: impl Into<String>,
        require_livemode: bool,
    ) -> Self {
        let verifier = WebhookVerifier::new(config.account(), config.webhook_secret().clone())
            .with_require_livemode(require_livemode);
        Self {
            config,
            http_client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            verifier,
        }
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base_url, path)
    }

    fn ensure_configured(&self) -> Result<(), PaymentError> {
        if self.config.has_keys() {
            Ok(())
        } else {
            Err(PaymentError::not_configured())
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, PaymentError> {
        self.ensure_configured()?;
        let request = self.http_client.get(self.url(path)).query(query);
        self.send(resource, path, request).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        resource: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, PaymentError> {
        self.ensure_configured()?;
        let request = self.http_client.post(self.url(path)).form(params);
        self.send(resource, path, request).await
    }

    async fn delete<T: DeserializeOwned>(&self, resource: &str, path: &str) -> Result<T, PaymentError> {
        self.ensure_configured()?;
        let request = self.http_client.delete(self.url(path));
        self.send(resource, path, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        resource: &str,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PaymentError> {
        let response = request
            .basic_auth(self.config.secret_key().expose_secret(), Option::<&str>::None)
            .header("Stripe-Version", STRIPE_API_VERSION)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::timeout(e.to_string())
                } else {
                    PaymentError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Self::map_error(status, resource, path, &body);
            tracing::debug!(
                account = %self.config.account(),
                status = status.as_u16(),
                error = %err,
                "Stripe request failed"
            );
            return Err(err);
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }

    fn map_error(status: reqwest::StatusCode, resource: &str, path: &str, body: &str) -> PaymentError {
        let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
        let provider_code = detail.as_ref().and_then(|d| d.code.clone());
        let message = detail
            .and_then(|d| d.message)
            .unwrap_or_else(|| format!("Stripe API error ({})", status));

        let err = match status.as_u16() {
            404 => {
                let id = path.rsplit('/').next().unwrap_or(path);
                return PaymentError::not_found(resource, id);
            }
            401 => PaymentError::authentication(message),
            429 => PaymentError::new(PaymentErrorCode::RateLimitExceeded, message),
            402 => PaymentError::new(PaymentErrorCode::CardDeclined, message),
            _ if provider_code.as_deref() == Some("resource_missing") => {
                PaymentError::new(PaymentErrorCode::NotFound, message)
            }
            _ => PaymentError::provider(message),
        };
        match provider_code {
            Some(code) => err.with_provider_code(code),
            None => err,
        }
    }

    fn metadata_params(params: &mut Params, metadata: &std::collections::HashMap<String, String>) {
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }
    }
}

#[async_trait]
impl StripeClient for StripeApiClient {
    fn account(&self) -> StripeAccount {
        self.config.account()
    }

    fn is_configured(&self) -> bool {
        self.config.has_keys()
    }

    fn test_env(&self) -> bool {
        self.config.test_env()
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, PaymentError> {
        let customer: Customer = self
            .get("Customer", &format!("customers/{}", customer_id), &[])
            .await?;
        if customer.deleted {
            return Err(PaymentError::not_found("Customer", customer_id));
        }
        Ok(customer)
    }

    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<Customer, PaymentError> {
        let mut params = vec![param("email", &request.email)];
        if let Some(name) = &request.name {
            params.push(param("name", name));
        }
        Self::metadata_params(&mut params, &request.metadata);
        self.post("Customer", "customers", &params).await
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription, PaymentError> {
        self.get(
            "Subscription",
            &format!("subscriptions/{}", subscription_id),
            &[param("expand[]", "default_payment_method")],
        )
        .await
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<Subscription, PaymentError> {
        self.delete("Subscription", &format!("subscriptions/{}", subscription_id))
            .await
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        request: UpdateSubscriptionRequest,
    ) -> Result<Subscription, PaymentError> {
        let mut params = Vec::new();
        if let Some(cancel) = request.cancel_at_period_end {
            params.push(param("cancel_at_period_end", cancel));
        }
        if let Some(price_id) = &request.price_id {
            // Replacing a price means replacing the existing item in place.
            let current = self.get_subscription(subscription_id).await?;
            if let Some(item) = current.items.data.first() {
                params.push(param("items[0][id]", &item.id));
            }
            params.push(param("items[0][price]", price_id));
        }
        if let Some(proration) = &request.proration_behavior {
            params.push(param("proration_behavior", proration));
        }
        Self::metadata_params(&mut params, &request.metadata);

        self.post("Subscription", &format!("subscriptions/{}", subscription_id), &params)
            .await
    }

    async fn get_price(&self, price_id: &str) -> Result<Price, PaymentError> {
        self.get("Price", &format!("prices/{}", price_id), &[]).await
    }

    async fn create_price(&self, request: CreatePriceRequest) -> Result<Price, PaymentError> {
        let mut params = vec![
            param("product", &request.product),
            param("unit_amount", request.unit_amount),
            param("currency", &request.currency),
            param("active", request.active),
        ];
        if let Some(interval) = &request.interval {
            params.push(param("recurring[interval]", interval));
        }
        if let Some(nickname) = &request.nickname {
            params.push(param("nickname", nickname));
        }
        self.post("Price", "prices", &params).await
    }

    async fn list_prices(&self, options: ListOptions) -> Result<List<Price>, PaymentError> {
        let query: Params = options
            .to_params()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.get("Price", "prices", &query).await
    }

    async fn get_product(&self, product_id: &str) -> Result<Product, PaymentError> {
        self.get("Product", &format!("products/{}", product_id), &[])
            .await
    }

    async fn create_product(&self, request: CreateProductRequest) -> Result<Product, PaymentError> {
        let mut params = vec![param("name", &request.name)];
        if let Some(description) = &request.description {
            params.push(param("description", description));
        }
        self.post("Product", "products", &params).await
    }

    async fn list_products(&self, options: ListOptions) -> Result<List<Product>, PaymentError> {
        let query: Params = options
            .to_params()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.get("Product", "products", &query).await
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let urls = self.config.urls();
        let mut params = vec![
            param("mode", "subscription"),
            param("line_items[0][price]", &request.price_id),
            param("line_items[0][quantity]", 1),
            param(
                "success_url",
                request
                    .success_url
                    .as_deref()
                    .unwrap_or(&urls.checkout_session_success_url),
            ),
            param(
                "cancel_url",
                request
                    .cancel_url
                    .as_deref()
                    .unwrap_or(&urls.checkout_session_cancel_url),
            ),
            param("billing_address_collection", "auto"),
        ];

        if let Some(customer) = &request.customer_id {
            params.push(param("customer", customer));
        } else if let Some(email) = &request.customer_email {
            params.push(param("customer_email", email));
        }

        // Stripe rejects promotion codes combined with an explicit coupon.
        if let Some(coupon) = &request.coupon_id {
            params.push(param("discounts[0][coupon]", coupon));
        } else if self.config.enable_promo_codes() {
            params.push(param("allow_promotion_codes", true));
        }

        if let Some(days) = request.trial_days {
            params.push(param("subscription_data[trial_period_days]", days));
        }

        if self.config.enable_automatic_tax() {
            params.push(param("automatic_tax[enabled]", true));
            params.push(param("tax_id_collection[enabled]", true));
            if request.customer_id.is_some() {
                params.push(param("customer_update[address]", "auto"));
                params.push(param("customer_update[name]", "auto"));
            }
        }

        Self::metadata_params(&mut params, &request.metadata);
        for (key, value) in &request.metadata {
            params.push((format!("subscription_data[metadata][{}]", key), value.clone()));
        }

        self.post("CheckoutSession", "checkout/sessions", &params)
            .await
    }

    async fn create_checkout_setup_session(
        &self,
        request: CreateSetupSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let urls = self.config.urls();
        let mut params = vec![
            param("mode", "setup"),
            param("payment_method_types[0]", "card"),
            param("customer", &request.customer_id),
            param(
                "success_url",
                request
                    .success_url
                    .as_deref()
                    .unwrap_or(&urls.checkout_setup_session_success_url),
            ),
            param(
                "cancel_url",
                request
                    .cancel_url
                    .as_deref()
                    .unwrap_or(&urls.checkout_setup_session_cancel_url),
            ),
            param("setup_intent_data[metadata][customer_id]", &request.customer_id),
        ];
        if let Some(currency) = &request.currency {
            params.push(param("currency", currency));
        }
        if let Some(subscription_id) = &request.subscription_id {
            params.push(param(
                "setup_intent_data[metadata][subscription_id]",
                subscription_id,
            ));
        }
        self.post("CheckoutSession", "checkout/sessions", &params)
            .await
    }

    async fn create_coupon(&self, request: CreateCouponRequest) -> Result<Coupon, PaymentError> {
        let mut params = vec![param("duration", &request.duration)];
        if let Some(name) = &request.name {
            params.push(param("name", name));
        }
        if let Some(percent) = request.percent_off {
            params.push(param("percent_off", percent));
        }
        if let Some(amount) = request.amount_off {
            params.push(param("amount_off", amount));
        }
        if let Some(currency) = &request.currency {
            params.push(param("currency", currency));
        }
        if let Some(months) = request.duration_in_months {
            params.push(param("duration_in_months", months));
        }
        self.post("Coupon", "coupons", &params).await
    }

    async fn create_webhook_endpoint(
        &self,
        request: CreateWebhookEndpointRequest,
    ) -> Result<WebhookEndpoint, PaymentError> {
        let mut params = vec![param("url", &request.url)];
        for (i, event) in request.enabled_events.iter().enumerate() {
            params.push((format!("enabled_events[{}]", i), event.clone()));
        }
        params.push(param(
            "api_version",
            request.api_version.as_deref().unwrap_or(STRIPE_API_VERSION),
        ));
        self.post("WebhookEndpoint", "webhook_endpoints", &params)
            .await
    }

    async fn delete_webhook_endpoint(&self, endpoint_id: &str) -> Result<DeletedObject, PaymentError> {
        self.delete("WebhookEndpoint", &format!("webhook_endpoints/{}", endpoint_id))
            .await
    }

    fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, PaymentError> {
        self.verifier.verify(payload, signature)
    }
}

/// Builds `StripeApiClient`s sharing one connection pool.
#[derive(Clone)]
pub struct HttpStripeClientFactory {
    http_client: reqwest::Client,
    api_base_url: String,
    require_livemode: bool,
}

impl HttpStripeClientFactory {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base_url: api_base_url.into(),
            require_livemode: false,
        }
    }

    /// Per-request timeout for outbound Stripe calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, PaymentError> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

impl Default for HttpStripeClientFactory {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl StripeClientFactory for HttpStripeClientFactory {
    fn build(&self, config: &AccountConfig) -> Result<Arc<dyn StripeClient>, PaymentError> {
        if !config.has_keys() {
            return Err(PaymentError::not_configured());
        }
        Ok(Arc::new(StripeApiClient::new(
            config.clone(),
            self.http_client.clone(),
            self.api_base_url.clone(),
            self.require_livemode,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::StripeKeys;

    fn config(account: StripeAccount, secret: &str) -> AccountConfig {
        AccountConfig::new(account, StripeKeys::new(secret, "pk_test"))
    }

    #[test]
    fn client_takes_account_from_config() {
        let factory = HttpStripeClientFactory::default();
        let client = factory
            .build(&config(StripeAccount::Secondary, "sk_test_s"))
            .unwrap();
        assert_eq!(client.account(), StripeAccount::Secondary);
        assert!(client.is_configured());
        assert!(client.test_env());
    }

    #[test]
    fn factory_refuses_config_without_keys() {
        let factory = HttpStripeClientFactory::default();
        let result = factory.build(&config(StripeAccount::Primary, ""));
        assert_eq!(result.err().unwrap().code, PaymentErrorCode::NotConfigured);
    }

    #[test]
    fn not_found_maps_to_resource_missing() {
        let err = StripeApiClient::map_error(
            reqwest::StatusCode::NOT_FOUND,
            "Subscription",
            "subscriptions/sub_404",
            r#"{"error":{"code":"resource_missing","message":"No such subscription"}}"#,
        );
        assert!(err.is_not_found());
        assert!(err.message.contains("sub_404"));
    }

    #[test]
    fn stripe_error_body_is_preserved() {
        let err = StripeApiClient::map_error(
            reqwest::StatusCode::BAD_REQUEST,
            "Customer",
            "customers",
            r#"{"error":{"code":"parameter_invalid_empty","message":"Missing email"}}"#,
        );
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert_eq!(err.message, "Missing email");
        assert_eq!(err.provider_code.as_deref(), Some("parameter_invalid_empty"));
    }

    #[test]
    fn auth_and_rate_limit_codes() {
        let auth = StripeApiClient::map_error(reqwest::StatusCode::UNAUTHORIZED, "Customer", "customers", "");
        assert_eq!(auth.code, PaymentErrorCode::AuthenticationError);

        let limited =
            StripeApiClient::map_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "Customer", "customers", "");
        assert!(limited.retryable);
    }
}

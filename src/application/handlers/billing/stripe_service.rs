//! StripeService - connect, configure and disconnect the Stripe integration.
//!
//! Configuration goes through the account manager, which decides between the
//! dual and legacy shapes. Disconnecting also clears every piece of cached
//! Stripe data, since ids from a disconnected account are meaningless.

use std::sync::{Arc, RwLock};

use secrecy::SecretString;

use crate::adapters::stripe::{DualStripeGateway, StripeAccountManager};
use crate::domain::billing::{GatewayError, GatewayState, StripeConfiguration};
use crate::ports::{ClearedStripeData, StoreError, StripeDataStore};

/// Webhook secret and handler URL the primary account's endpoint is
/// registered with.
#[derive(Debug, Clone)]
pub struct WebhookRegistration {
    pub handler_url: String,
    pub secret: SecretString,
}

/// Lifecycle of the Stripe integration.
pub struct StripeService {
    manager: Arc<StripeAccountManager>,
    data_store: Arc<dyn StripeDataStore>,
    webhook: RwLock<Option<WebhookRegistration>>,
}

impl StripeService {
    pub fn new(manager: Arc<StripeAccountManager>, data_store: Arc<dyn StripeDataStore>) -> Self {
        Self {
            manager,
            data_store,
            webhook: RwLock::new(None),
        }
    }

    /// Gateway over the accounts this service configures.
    pub fn gateway(&self) -> DualStripeGateway {
        self.manager.gateway()
    }

    pub fn manager(&self) -> &Arc<StripeAccountManager> {
        &self.manager
    }

    /// Configures the Stripe clients from either configuration shape.
    ///
    /// The primary account's webhook secret and handler URL are recorded for
    /// endpoint registration.
    pub fn configure(&self, config: StripeConfiguration) -> Result<GatewayState, GatewayError> {
        let state = self.manager.configure(&config)?;

        let registration = config.flat().map(|primary| WebhookRegistration {
            handler_url: primary.webhook_handler_url().to_string(),
            secret: primary.webhook_secret().clone(),
        });
        *self.webhook.write().unwrap_or_else(|e| e.into_inner()) = registration;

        Ok(state)
    }

    /// Marks the integration live.
    pub fn connect(&self) {
        tracing::info!(state = ?self.manager.state(), "Stripe live mode enabled");
    }

    /// Clears cached Stripe data, then drops the Stripe clients.
    ///
    /// # Errors
    ///
    /// If clearing cached data fails the clients are left in place.
    pub async fn disconnect(&self) -> Result<ClearedStripeData, StoreError> {
        let cleared = self.data_store.clear_stripe_data().await?;
        tracing::info!(
            prices = cleared.prices,
            products = cleared.products,
            customer_links = cleared.customer_links,
            coupon_ids = cleared.coupon_ids,
            "Cleared cached Stripe data"
        );

        self.webhook
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.manager.disconnect();

        tracing::info!("Stripe live mode disabled");
        Ok(cleared)
    }

    pub fn webhook_registration(&self) -> Option<WebhookRegistration> {
        self.webhook
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_configured(&self) -> bool {
        self.manager.is_configured()
    }
}

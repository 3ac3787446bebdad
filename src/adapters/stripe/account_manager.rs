//! Stripe account manager.
//!
//! Owns at most two Stripe clients (primary and secondary), built from the
//! resolved configuration. Exposes fallback-aware reads and account-aware
//! writes.
//!
//! # Configuration modes
//!
//! - **Dual**: keys for each account are read from settings. Each key set
//!   yields one client; no key set at all is a configuration error.
//! - **Legacy**: one client labelled primary, built from the flat config if it
//!   carries both keys. Without keys the manager stays unconfigured.
//!
//! # Example
//!
//! ```ignore
//! let manager = StripeAccountManager::new(settings, factory);
//! manager.configure(&StripeConfiguration::Legacy(config))?;
//!
//! if let Some(found) = manager.get_customer_with_fallback("cus_123").await {
//!     println!("{} lives in the {} account", found.resource.id, found.account);
//! }
//! ```

use std::sync::{Arc, Mutex};

use crate::domain::billing::{
    AccountConfig, GatewayError, GatewayState, Located, StripeAccount, StripeConfiguration,
    StripeKeys,
};
use crate::ports::{
    CheckoutSession, CreateCheckoutSessionRequest, Customer, SettingsProvider, StripeClient,
    StripeClientFactory, Subscription,
};

use super::client_slot::{AccountClients, ClientSlot};
use super::dual_gateway::DualStripeGateway;
use super::fallback::lookup_with_fallback;

/// Holds and rebuilds the per-account Stripe clients.
pub struct StripeAccountManager {
    settings: Arc<dyn SettingsProvider>,
    factory: Arc<dyn StripeClientFactory>,
    slot: ClientSlot,
    /// Serializes `configure` and `disconnect`.
    reconfigure: Mutex<()>,
}

impl StripeAccountManager {
    pub fn new(settings: Arc<dyn SettingsProvider>, factory: Arc<dyn StripeClientFactory>) -> Self {
        Self::with_slot(settings, factory, ClientSlot::new())
    }

    /// A manager driving an existing client slot.
    pub fn with_slot(
        settings: Arc<dyn SettingsProvider>,
        factory: Arc<dyn StripeClientFactory>,
        slot: ClientSlot,
    ) -> Self {
        Self {
            settings,
            factory,
            slot,
            reconfigure: Mutex::new(()),
        }
    }

    /// A gateway over the clients this manager builds.
    pub fn gateway(&self) -> DualStripeGateway {
        DualStripeGateway::with_slot(Arc::clone(&self.factory), self.slot.clone())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ════════════════════════════════════════════════════════════════════════════

    /// Discards existing clients and builds new ones from `config`.
    ///
    /// On error no client is retained, including clients from an earlier
    /// successful call.
    pub fn configure(&self, config: &StripeConfiguration) -> Result<GatewayState, GatewayError> {
        let _guard = self.reconfigure.lock().unwrap_or_else(|e| e.into_inner());

        let built = if self.settings.dual_accounts_enabled() {
            self.build_dual(config)
        } else {
            self.build_legacy(config)
        };

        match built {
            Ok(clients) => {
                let state = clients.state();
                self.slot.replace(clients);
                tracing::info!(state = ?state, "Stripe accounts configured");
                Ok(state)
            }
            Err(e) => {
                self.slot.clear();
                tracing::error!(error = %e, "Failed to configure Stripe accounts");
                Err(e)
            }
        }
    }

    fn build_dual(&self, config: &StripeConfiguration) -> Result<AccountClients, GatewayError> {
        let keys = self.settings.dual_keys();
        if keys.primary.is_none() && keys.secondary.is_none() {
            return Err(GatewayError::configuration(
                "Dual Stripe accounts are enabled but no account has keys configured",
            ));
        }

        let build = |account: StripeAccount, account_keys: Option<StripeKeys>| {
            account_keys
                .map(|account_keys| {
                    let test_env = self.settings.is_test_env(account, &account_keys);
                    let account_config = base_config(config, account)
                        .map(|base| base.for_account(account).with_keys(account_keys.clone()))
                        .unwrap_or_else(|| AccountConfig::new(account, account_keys))
                        .with_test_env(test_env);
                    self.build_client(&account_config)
                })
                .transpose()
        };

        let primary = build(StripeAccount::Primary, keys.primary)?;
        let secondary = build(StripeAccount::Secondary, keys.secondary)?;
        Ok(AccountClients::new(primary, secondary))
    }

    fn build_legacy(&self, config: &StripeConfiguration) -> Result<AccountClients, GatewayError> {
        match config.flat() {
            Some(flat) if flat.has_keys() => {
                let primary = flat.clone().for_account(StripeAccount::Primary);
                let client = self.build_client(&primary)?;
                Ok(AccountClients::new(Some(client), None))
            }
            _ => {
                tracing::info!("No Stripe keys configured, Stripe integration inactive");
                Ok(AccountClients::empty())
            }
        }
    }

    fn build_client(&self, config: &AccountConfig) -> Result<Arc<dyn StripeClient>, GatewayError> {
        let account = config.account();
        self.factory.build(config).map_err(|e| {
            tracing::error!(account = %account, error = %e, "Failed to build Stripe client");
            GatewayError::upstream(account, e)
        })
    }

    /// Drops both clients. Safe to call when already disconnected.
    pub fn disconnect(&self) {
        let _guard = self.reconfigure.lock().unwrap_or_else(|e| e.into_inner());
        let was_configured = self.is_configured();
        self.slot.clear();
        if was_configured {
            tracing::info!("Stripe accounts disconnected");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.state().is_configured()
    }

    pub fn state(&self) -> GatewayState {
        self.slot.snapshot().state()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Client access
    // ════════════════════════════════════════════════════════════════════════════

    /// Configured clients, primary first.
    pub fn all_clients(&self) -> Vec<(StripeAccount, Arc<dyn StripeClient>)> {
        self.slot.snapshot().all()
    }

    pub fn client(&self, account: StripeAccount) -> Option<Arc<dyn StripeClient>> {
        self.slot.snapshot().get(account).cloned()
    }

    pub fn primary_client(&self) -> Option<Arc<dyn StripeClient>> {
        self.client(StripeAccount::Primary)
    }

    pub fn secondary_client(&self) -> Option<Arc<dyn StripeClient>> {
        self.client(StripeAccount::Secondary)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Operations
    // ════════════════════════════════════════════════════════════════════════════

    /// Finds a customer in the primary account, then the secondary.
    ///
    /// Returns `None` when no configured account has it.
    pub async fn get_customer_with_fallback(&self, customer_id: &str) -> Option<Located<Customer>> {
        let clients = self.slot.snapshot();
        lookup_with_fallback(&clients, "Customer", customer_id, |client| async move {
            client.get_customer(customer_id).await
        })
        .await
        .into_found()
    }

    /// Finds a subscription in the primary account, then the secondary.
    pub async fn get_subscription_with_fallback(
        &self,
        subscription_id: &str,
    ) -> Option<Located<Subscription>> {
        let clients = self.slot.snapshot();
        self.find_subscription(&clients, subscription_id).await
    }

    async fn find_subscription(
        &self,
        clients: &AccountClients,
        subscription_id: &str,
    ) -> Option<Located<Subscription>> {
        lookup_with_fallback(clients, "Subscription", subscription_id, |client| async move {
            client.get_subscription(subscription_id).await
        })
        .await
        .into_found()
    }

    /// Cancels a subscription in whichever account holds it.
    ///
    /// A cancel failure is not retried against the other account.
    pub async fn cancel_subscription_with_fallback(
        &self,
        subscription_id: &str,
    ) -> Result<Located<Subscription>, GatewayError> {
        let clients = self.slot.snapshot();
        let found = self
            .find_subscription(&clients, subscription_id)
            .await
            .ok_or_else(|| GatewayError::not_found("Subscription", subscription_id))?;

        let account = found.account;
        let client = clients
            .configured(account)
            .ok_or_else(|| GatewayError::account_not_configured(account))?;

        match client.cancel_subscription(subscription_id).await {
            Ok(subscription) => {
                tracing::info!(account = %account, subscription_id, "Cancelled subscription");
                Ok(Located::new(subscription, account))
            }
            Err(e) => {
                tracing::error!(
                    account = %account,
                    subscription_id,
                    error = %e,
                    "Failed to cancel subscription"
                );
                Err(GatewayError::upstream(account, e))
            }
        }
    }

    /// Creates a checkout session. Always in the primary account.
    pub async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let clients = self.slot.snapshot();
        let client = clients
            .configured(StripeAccount::Primary)
            .ok_or_else(|| GatewayError::account_not_configured(StripeAccount::Primary))?;

        client
            .create_checkout_session(request)
            .await
            .map_err(|e| GatewayError::upstream(StripeAccount::Primary, e))
    }
}

/// The supplied config to start from for `account`.
fn base_config(config: &StripeConfiguration, account: StripeAccount) -> Option<AccountConfig> {
    match config {
        StripeConfiguration::Dual(dual) => dual.get(account).or(dual.primary.as_ref()).cloned(),
        StripeConfiguration::Legacy(flat) => Some(flat.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::settings::InMemorySettings;
    use crate::adapters::stripe::{MockStripeClient, MockStripeClientFactory};
    use crate::domain::billing::PaymentError;
    use crate::ports::DUAL_ACCOUNTS_ENABLED_KEY;

    fn flat(secret: &str, public: &str) -> StripeConfiguration {
        StripeConfiguration::Legacy(AccountConfig::new(
            StripeAccount::Primary,
            StripeKeys::new(secret, public),
        ))
    }

    fn dual_settings() -> InMemorySettings {
        InMemorySettings::from_pairs([
            (DUAL_ACCOUNTS_ENABLED_KEY, "true"),
            ("stripe_primary_secret_key", "sk_test_p"),
            ("stripe_primary_publishable_key", "pk_test_p"),
            ("stripe_secondary_secret_key", "sk_test_s"),
            ("stripe_secondary_publishable_key", "pk_test_s"),
        ])
    }

    fn manager(settings: InMemorySettings) -> (StripeAccountManager, MockStripeClientFactory) {
        let factory = MockStripeClientFactory::new();
        let manager = StripeAccountManager::new(Arc::new(settings), Arc::new(factory.clone()));
        (manager, factory)
    }

    #[test]
    fn legacy_with_keys_builds_primary_only() {
        let (manager, factory) = manager(InMemorySettings::new());
        let state = manager.configure(&flat("sk_test", "pk_test")).unwrap();

        assert_eq!(state, GatewayState::PrimaryOnly);
        assert!(manager.secondary_client().is_none());
        assert_eq!(factory.builds(), vec![StripeAccount::Primary]);
    }

    #[test]
    fn legacy_without_keys_stays_unconfigured() {
        let (manager, factory) = manager(InMemorySettings::new());
        let state = manager.configure(&flat("", "")).unwrap();

        assert_eq!(state, GatewayState::Unconfigured);
        assert!(!manager.is_configured());
        assert!(factory.builds().is_empty());
    }

    #[test]
    fn dual_builds_a_client_per_key_set() {
        let (manager, factory) = manager(dual_settings());
        let state = manager.configure(&flat("sk_ignored", "pk_ignored")).unwrap();

        assert_eq!(state, GatewayState::Dual);
        assert_eq!(
            factory.builds(),
            vec![StripeAccount::Primary, StripeAccount::Secondary]
        );
        let accounts: Vec<_> = manager.all_clients().into_iter().map(|(a, _)| a).collect();
        assert_eq!(accounts, vec![StripeAccount::Primary, StripeAccount::Secondary]);
    }

    #[test]
    fn dual_with_only_secondary_keys() {
        let settings = InMemorySettings::from_pairs([
            (DUAL_ACCOUNTS_ENABLED_KEY, "true"),
            ("stripe_secondary_connect_secret_key", "sk_test_s"),
            ("stripe_secondary_connect_publishable_key", "pk_test_s"),
        ]);
        let (manager, _) = manager(settings);
        let state = manager.configure(&StripeConfiguration::Dual(Default::default())).unwrap();
        assert_eq!(state, GatewayState::SecondaryOnly);
    }

    #[test]
    fn dual_without_any_keys_is_configuration_error() {
        let settings = InMemorySettings::from_pairs([(DUAL_ACCOUNTS_ENABLED_KEY, "true")]);
        let (manager, _) = manager(settings);

        let err = manager.configure(&flat("sk", "pk")).unwrap_err();
        assert!(err.is_configuration());
        assert!(!manager.is_configured());
    }

    #[test]
    fn failed_reconfigure_drops_previous_clients() {
        let (manager, factory) = manager(dual_settings());
        manager.configure(&flat("sk", "pk")).unwrap();
        assert!(manager.is_configured());

        factory.fail_builds_for(StripeAccount::Secondary, PaymentError::authentication("revoked"));
        assert!(manager.configure(&flat("sk", "pk")).is_err());

        assert_eq!(manager.state(), GatewayState::Unconfigured);
        assert!(manager.primary_client().is_none());
    }

    #[test]
    fn disconnect_twice_is_fine() {
        let (manager, _) = manager(InMemorySettings::new());
        manager.configure(&flat("sk", "pk")).unwrap();

        manager.disconnect();
        assert!(!manager.is_configured());
        manager.disconnect();
        assert!(!manager.is_configured());
    }

    #[tokio::test]
    async fn cancel_goes_to_discovered_account_only() {
        let (manager, factory) = manager(dual_settings());
        manager.configure(&flat("sk", "pk")).unwrap();
        let primary = factory.client(StripeAccount::Primary);
        let secondary = factory.client(StripeAccount::Secondary);
        secondary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));

        let cancelled = manager.cancel_subscription_with_fallback("sub_1").await.unwrap();

        assert_eq!(cancelled.account, StripeAccount::Secondary);
        assert_eq!(primary.call_count("cancel_subscription"), 0);
        assert_eq!(secondary.call_count("cancel_subscription"), 1);
    }

    #[tokio::test]
    async fn cancel_failure_is_not_retried_elsewhere() {
        let (manager, factory) = manager(dual_settings());
        manager.configure(&flat("sk", "pk")).unwrap();
        let primary = factory.client(StripeAccount::Primary);
        let secondary = factory.client(StripeAccount::Secondary);
        primary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));
        primary.set_method_error("cancel_subscription", PaymentError::network("reset"));

        let err = manager.cancel_subscription_with_fallback("sub_1").await.unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Upstream { account: StripeAccount::Primary, .. }
        ));
        assert_eq!(secondary.call_count("get_subscription"), 0);
        assert_eq!(secondary.call_count("cancel_subscription"), 0);
    }

    #[tokio::test]
    async fn cancel_unknown_subscription_is_not_found() {
        let (manager, _) = manager(dual_settings());
        manager.configure(&flat("sk", "pk")).unwrap();

        let err = manager.cancel_subscription_with_fallback("sub_missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn lookup_without_clients_is_none() {
        let (manager, _) = manager(InMemorySettings::new());
        assert!(manager.get_customer_with_fallback("cus_1").await.is_none());
    }

    #[tokio::test]
    async fn checkout_requires_primary() {
        let settings = InMemorySettings::from_pairs([
            (DUAL_ACCOUNTS_ENABLED_KEY, "true"),
            ("stripe_secondary_secret_key", "sk_test_s"),
            ("stripe_secondary_publishable_key", "pk_test_s"),
        ]);
        let (manager, factory) = manager(settings);
        manager.configure(&flat("", "")).unwrap();

        let err = manager
            .create_checkout_session(CreateCheckoutSessionRequest::default())
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(!factory
            .client(StripeAccount::Secondary)
            .was_called("create_checkout_session"));
    }
}

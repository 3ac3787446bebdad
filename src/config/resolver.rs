//! Stripe config resolver.
//!
//! Turns persisted settings, the site URL and webhook secrets into the
//! per-account configs the gateway is built from. Returns `None` when the
//! primary account has no keys, which means the Stripe integration is off.
//!
//! Both accounts share one set of checkout redirect URLs. Webhook handler
//! URLs differ by a `secondary/` path segment so inbound calls can be routed
//! by path alone.

use std::ops::Deref;
use std::sync::Arc;

use url::Url;

use crate::domain::billing::{
    AccountConfig, CheckoutUrls, DualAccountConfig, GatewayError, LazyFlag, StripeAccount,
    StripeConfiguration, StripeKeys,
};
use crate::ports::{
    LabsFlags, SettingsProvider, SiteUrlProvider, WebhookSecretSource, AUTOMATIC_TAX_FLAG,
};

use super::server::Environment;

/// Placeholder primary webhook secret used outside production.
pub const DEFAULT_WEBHOOK_SECRET: &str = "DEFAULT_WEBHOOK_SECRET";

/// Placeholder secondary webhook secret used outside production.
pub const DEFAULT_WEBHOOK_SECRET_SECONDARY: &str = "DEFAULT_WEBHOOK_SECRET_SECONDARY";

/// Webhook path for the primary account, relative to the site URL.
pub const WEBHOOK_PATH: &str = "members/webhooks/stripe/";

/// Webhook path for the secondary account, relative to the site URL.
pub const SECONDARY_WEBHOOK_PATH: &str = "members/webhooks/stripe/secondary/";

/// Query parameter attached to checkout redirect URLs.
const STRIPE_QUERY_PARAM: &str = "stripe";

/// Resolved per-account configs.
///
/// Dereferences to the primary config so single-account callers can keep
/// treating it as one flat config.
#[derive(Debug, Clone)]
pub struct ResolvedStripeConfig {
    pub primary: AccountConfig,
    pub secondary: Option<AccountConfig>,
}

impl ResolvedStripeConfig {
    pub fn get(&self, account: StripeAccount) -> Option<&AccountConfig> {
        match account {
            StripeAccount::Primary => Some(&self.primary),
            StripeAccount::Secondary => self.secondary.as_ref(),
        }
    }

    /// The configuration handed to the account manager.
    pub fn into_configuration(self) -> StripeConfiguration {
        StripeConfiguration::Dual(DualAccountConfig::new(Some(self.primary), self.secondary))
    }
}

impl Deref for ResolvedStripeConfig {
    type Target = AccountConfig;

    fn deref(&self) -> &Self::Target {
        &self.primary
    }
}

/// Builds [`ResolvedStripeConfig`] from injected settings capabilities.
pub struct StripeConfigResolver {
    settings: Arc<dyn SettingsProvider>,
    labs: Arc<dyn LabsFlags>,
    site_url: Arc<dyn SiteUrlProvider>,
    secrets: Arc<dyn WebhookSecretSource>,
    environment: Environment,
    enable_promo_codes: bool,
}

impl StripeConfigResolver {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        labs: Arc<dyn LabsFlags>,
        site_url: Arc<dyn SiteUrlProvider>,
        secrets: Arc<dyn WebhookSecretSource>,
        environment: Environment,
        enable_promo_codes: bool,
    ) -> Self {
        Self {
            settings,
            labs,
            site_url,
            secrets,
            environment,
            enable_promo_codes,
        }
    }

    /// Resolves the current configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Configuration` if the site URL cannot be parsed.
    pub fn resolve(&self) -> Result<Option<ResolvedStripeConfig>, GatewayError> {
        let keys = self.settings.dual_keys();
        let Some(primary_keys) = keys.primary else {
            tracing::debug!("No primary Stripe keys, Stripe integration disabled");
            return Ok(None);
        };

        let site = parse_site_url(&self.site_url.site_url())?;
        let urls = checkout_urls(&site);
        let names = self.settings.account_names();

        let primary_secret = self.webhook_secret(StripeAccount::Primary);
        let primary = self
            .account_config(StripeAccount::Primary, primary_keys, &urls)
            .with_webhook(primary_secret, webhook_url(&site, WEBHOOK_PATH)?)
            .with_display_name(names.primary);

        let secondary = match keys.secondary {
            Some(secondary_keys) => {
                let secret = self.webhook_secret(StripeAccount::Secondary);
                Some(
                    self.account_config(StripeAccount::Secondary, secondary_keys, &urls)
                        .with_webhook(secret, webhook_url(&site, SECONDARY_WEBHOOK_PATH)?)
                        .with_display_name(names.secondary),
                )
            }
            None => None,
        };

        Ok(Some(ResolvedStripeConfig { primary, secondary }))
    }

    fn account_config(
        &self,
        account: StripeAccount,
        keys: StripeKeys,
        urls: &CheckoutUrls,
    ) -> AccountConfig {
        let test_env = self.settings.is_test_env(account, &keys);
        let labs = Arc::clone(&self.labs);
        AccountConfig::new(account, keys)
            .with_urls(urls.clone())
            .with_promo_codes(self.enable_promo_codes)
            .with_automatic_tax(LazyFlag::from_fn(move || labs.is_set(AUTOMATIC_TAX_FLAG)))
            .with_test_env(test_env)
    }

    /// The account's webhook secret, or a placeholder outside production.
    fn webhook_secret(&self, account: StripeAccount) -> String {
        if let Some(secret) = self.secrets.webhook_secret(account) {
            return secret;
        }
        if self.environment.is_production() {
            tracing::warn!(
                account = %account,
                "Webhook secret not set, webhooks for this account will be rejected"
            );
            return String::new();
        }
        if account.is_primary() {
            tracing::warn!(
                "Cannot use remote webhooks in development. Forward Stripe webhooks locally \
                 and set WEBHOOK_SECRET to the forwarding secret"
            );
            DEFAULT_WEBHOOK_SECRET.to_string()
        } else {
            DEFAULT_WEBHOOK_SECRET_SECONDARY.to_string()
        }
    }
}

fn parse_site_url(site_url: &str) -> Result<Url, GatewayError> {
    Url::parse(site_url)
        .map_err(|e| GatewayError::configuration(format!("Invalid site URL {site_url}: {e}")))
}

fn webhook_url(site: &Url, path: &str) -> Result<String, GatewayError> {
    site.join(path)
        .map(String::from)
        .map_err(|e| GatewayError::configuration(format!("Invalid webhook URL {path}: {e}")))
}

fn checkout_urls(site: &Url) -> CheckoutUrls {
    CheckoutUrls {
        checkout_session_success_url: with_stripe_marker(site, "success"),
        checkout_session_cancel_url: with_stripe_marker(site, "cancel"),
        checkout_setup_session_success_url: with_stripe_marker(site, "billing-update-success"),
        checkout_setup_session_cancel_url: with_stripe_marker(site, "billing-update-cancel"),
    }
}

/// Sets `stripe=<marker>` on the site URL, replacing any existing value.
fn with_stripe_marker(site: &Url, marker: &str) -> String {
    let kept: Vec<(String, String)> = site
        .query_pairs()
        .filter(|(key, _)| key != STRIPE_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = site.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(STRIPE_QUERY_PARAM, marker);
    url.into()
}

//! Per-account Stripe configuration records.
//!
//! An `AccountConfig` is immutable once built. Reconfiguration replaces the
//! whole record; nothing mutates one in place.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::account::StripeAccount;

/// A secret/publishable key pair for one Stripe account.
#[derive(Clone)]
pub struct StripeKeys {
    secret_key: SecretString,
    public_key: String,
}

impl StripeKeys {
    pub fn new(secret_key: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            public_key: public_key.into(),
        }
    }

    /// Builds a key pair only when both halves are non-empty.
    pub fn from_parts(secret_key: Option<String>, public_key: Option<String>) -> Option<Self> {
        match (secret_key, public_key) {
            (Some(secret), Some(public)) if !secret.is_empty() && !public.is_empty() => {
                Some(Self::new(secret, public))
            }
            _ => None,
        }
    }

    pub fn secret_key(&self) -> &SecretString {
        &self.secret_key
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// True for `sk_test_` keys.
    pub fn is_test_key(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_test_")
    }
}

impl fmt::Debug for StripeKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeKeys")
            .field("secret_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// A boolean that is evaluated every time it is read.
///
/// Used for settings such as automatic tax that can be toggled at runtime
/// without rebuilding the surrounding config.
#[derive(Clone)]
pub struct LazyFlag(Arc<dyn Fn() -> bool + Send + Sync>);

impl LazyFlag {
    /// A flag backed by a closure, read on every access.
    pub fn from_fn(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A flag with a fixed value.
    pub fn fixed(value: bool) -> Self {
        Self::from_fn(move || value)
    }

    pub fn get(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for LazyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazyFlag").field(&self.get()).finish()
    }
}

impl Default for LazyFlag {
    fn default() -> Self {
        Self::fixed(false)
    }
}

/// Checkout redirect URLs. The same set is shared by both accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub checkout_session_success_url: String,
    pub checkout_session_cancel_url: String,
    pub checkout_setup_session_success_url: String,
    pub checkout_setup_session_cancel_url: String,
}

/// Configuration for one Stripe account.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    account: StripeAccount,
    keys: StripeKeys,
    webhook_secret: SecretString,
    webhook_handler_url: String,
    account_display_name: Option<String>,
    enable_promo_codes: bool,
    automatic_tax: LazyFlag,
    urls: CheckoutUrls,
    test_env: bool,
}

impl AccountConfig {
    /// Creates a config with empty webhook settings and default URLs.
    pub fn new(account: StripeAccount, keys: StripeKeys) -> Self {
        let test_env = keys.is_test_key();
        Self {
            account,
            keys,
            webhook_secret: SecretString::new(String::new()),
            webhook_handler_url: String::new(),
            account_display_name: None,
            enable_promo_codes: false,
            automatic_tax: LazyFlag::default(),
            urls: CheckoutUrls::default(),
            test_env,
        }
    }

    pub fn with_webhook(mut self, secret: impl Into<String>, handler_url: impl Into<String>) -> Self {
        self.webhook_secret = SecretString::new(secret.into());
        self.webhook_handler_url = handler_url.into();
        self
    }

    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.account_display_name = name;
        self
    }

    pub fn with_promo_codes(mut self, enabled: bool) -> Self {
        self.enable_promo_codes = enabled;
        self
    }

    pub fn with_automatic_tax(mut self, flag: LazyFlag) -> Self {
        self.automatic_tax = flag;
        self
    }

    pub fn with_urls(mut self, urls: CheckoutUrls) -> Self {
        self.urls = urls;
        self
    }

    pub fn with_test_env(mut self, test_env: bool) -> Self {
        self.test_env = test_env;
        self
    }

    /// Returns a copy of this config with a different key pair.
    pub fn with_keys(mut self, keys: StripeKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Returns a copy of this config relabelled for another account.
    pub fn for_account(mut self, account: StripeAccount) -> Self {
        self.account = account;
        self
    }

    pub fn account(&self) -> StripeAccount {
        self.account
    }

    pub fn keys(&self) -> &StripeKeys {
        &self.keys
    }

    pub fn secret_key(&self) -> &SecretString {
        self.keys.secret_key()
    }

    pub fn public_key(&self) -> &str {
        self.keys.public_key()
    }

    /// True when both halves of the key pair are set.
    pub fn has_keys(&self) -> bool {
        !self.keys.secret_key().expose_secret().is_empty() && !self.keys.public_key().is_empty()
    }

    pub fn webhook_secret(&self) -> &SecretString {
        &self.webhook_secret
    }

    pub fn webhook_handler_url(&self) -> &str {
        &self.webhook_handler_url
    }

    pub fn account_display_name(&self) -> Option<&str> {
        self.account_display_name.as_deref()
    }

    pub fn enable_promo_codes(&self) -> bool {
        self.enable_promo_codes
    }

    /// Reads the automatic tax flag at call time.
    pub fn enable_automatic_tax(&self) -> bool {
        self.automatic_tax.get()
    }

    pub fn urls(&self) -> &CheckoutUrls {
        &self.urls
    }

    pub fn test_env(&self) -> bool {
        self.test_env
    }
}

/// The dual-account configuration shape: either account may be absent.
#[derive(Debug, Clone, Default)]
pub struct DualAccountConfig {
    pub primary: Option<AccountConfig>,
    pub secondary: Option<AccountConfig>,
}

impl DualAccountConfig {
    pub fn new(primary: Option<AccountConfig>, secondary: Option<AccountConfig>) -> Self {
        Self { primary, secondary }
    }

    pub fn get(&self, account: StripeAccount) -> Option<&AccountConfig> {
        match account {
            StripeAccount::Primary => self.primary.as_ref(),
            StripeAccount::Secondary => self.secondary.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }
}

/// Configuration handed to the gateway lifecycle.
///
/// Legacy callers supply one flat account config which is always treated as
/// the primary account.
#[derive(Debug, Clone)]
pub enum StripeConfiguration {
    Legacy(AccountConfig),
    Dual(DualAccountConfig),
}

impl StripeConfiguration {
    /// The flat single-account view: the legacy config, or the dual primary.
    pub fn flat(&self) -> Option<&AccountConfig> {
        match self {
            StripeConfiguration::Legacy(config) => Some(config),
            StripeConfiguration::Dual(dual) => dual.primary.as_ref(),
        }
    }

    /// Normalises both shapes into the dual shape.
    pub fn into_dual(self) -> DualAccountConfig {
        match self {
            StripeConfiguration::Legacy(config) => DualAccountConfig {
                primary: Some(config.for_account(StripeAccount::Primary)),
                secondary: None,
            },
            StripeConfiguration::Dual(dual) => dual,
        }
    }
}

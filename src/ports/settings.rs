//! Settings access ports.
//!
//! The config resolver and account manager read persisted settings, runtime
//! feature flags, the site URL and webhook secrets through these traits. They
//! are injected at construction; nothing reads a global.

use crate::domain::billing::{StripeAccount, StripeKeys};

/// Persisted settings key for the dual-accounts feature flag.
pub const DUAL_ACCOUNTS_ENABLED_KEY: &str = "stripe_dual_accounts_enabled";

/// Runtime feature flag gating Stripe automatic tax.
pub const AUTOMATIC_TAX_FLAG: &str = "stripeAutomaticTax";

/// Builds the persisted settings key for one account field.
///
/// `settings_key(Some(Primary), "connect_secret_key")` gives
/// `stripe_primary_connect_secret_key`; `None` gives the legacy unprefixed key.
pub fn settings_key(account: Option<StripeAccount>, field: &str) -> String {
    match account {
        Some(account) => format!("stripe_{}_{}", account.as_str(), field),
        None => format!("stripe_{}", field),
    }
}

/// Key pairs for both accounts.
#[derive(Debug, Clone, Default)]
pub struct DualStripeKeys {
    pub primary: Option<StripeKeys>,
    pub secondary: Option<StripeKeys>,
}

/// Display names for both accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountNames {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

/// Read access to persisted settings.
///
/// Implementors supply the two raw getters; the account helpers are derived.
pub trait SettingsProvider: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;

    fn get_bool(&self, key: &str) -> Option<bool>;

    /// Whether dual-account mode is switched on.
    fn dual_accounts_enabled(&self) -> bool {
        self.get_bool(DUAL_ACCOUNTS_ENABLED_KEY).unwrap_or(false)
    }

    /// Keys stored under one prefix: Connect keys win over direct keys.
    fn keys_for_prefix(&self, account: Option<StripeAccount>) -> Option<StripeKeys> {
        let connect = StripeKeys::from_parts(
            self.get_string(&settings_key(account, "connect_secret_key")),
            self.get_string(&settings_key(account, "connect_publishable_key")),
        );
        connect.or_else(|| {
            StripeKeys::from_parts(
                self.get_string(&settings_key(account, "secret_key")),
                self.get_string(&settings_key(account, "publishable_key")),
            )
        })
    }

    /// The primary account's keys, falling back to the legacy unprefixed keys.
    fn primary_keys(&self) -> Option<StripeKeys> {
        self.keys_for_prefix(Some(StripeAccount::Primary))
            .or_else(|| self.keys_for_prefix(None))
    }

    fn secondary_keys(&self) -> Option<StripeKeys> {
        self.keys_for_prefix(Some(StripeAccount::Secondary))
    }

    fn account_keys(&self, account: StripeAccount) -> Option<StripeKeys> {
        match account {
            StripeAccount::Primary => self.primary_keys(),
            StripeAccount::Secondary => self.secondary_keys(),
        }
    }

    fn dual_keys(&self) -> DualStripeKeys {
        DualStripeKeys {
            primary: self.primary_keys(),
            secondary: self.secondary_keys(),
        }
    }

    fn account_names(&self) -> AccountNames {
        let name = |account: Option<StripeAccount>| {
            self.get_string(&settings_key(account, "connect_display_name"))
                .filter(|n| !n.is_empty())
        };
        AccountNames {
            primary: name(Some(StripeAccount::Primary)).or_else(|| name(None)),
            secondary: name(Some(StripeAccount::Secondary)),
        }
    }

    /// The stored Connect livemode flag, if any.
    fn account_livemode(&self, account: StripeAccount) -> Option<bool> {
        let prefixed = self.get_bool(&settings_key(Some(account), "connect_livemode"));
        match account {
            StripeAccount::Primary => {
                prefixed.or_else(|| self.get_bool(&settings_key(None, "connect_livemode")))
            }
            StripeAccount::Secondary => prefixed,
        }
    }

    /// Test mode: an `sk_test_` key, or Connect livemode explicitly off.
    fn is_test_env(&self, account: StripeAccount, keys: &StripeKeys) -> bool {
        keys.is_test_key() || self.account_livemode(account) == Some(false)
    }

    fn account_id(&self, account: StripeAccount) -> Option<String> {
        self.get_string(&settings_key(Some(account), "connect_account_id"))
    }
}

/// Runtime feature flags, read at use time.
pub trait LabsFlags: Send + Sync {
    fn is_set(&self, flag: &str) -> bool;
}

/// Site URL capability used to build redirect and webhook URLs.
pub trait SiteUrlProvider: Send + Sync {
    /// Canonical site URL, e.g. `https://example.com/`.
    fn site_url(&self) -> String;
}

/// Source of webhook signing secrets.
pub trait WebhookSecretSource: Send + Sync {
    fn webhook_secret(&self, account: StripeAccount) -> Option<String>;
}

/// Reads `WEBHOOK_SECRET` / `WEBHOOK_SECRET_SECONDARY` from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvSecrets;

impl ProcessEnvSecrets {
    pub fn env_var(account: StripeAccount) -> &'static str {
        match account {
            StripeAccount::Primary => "WEBHOOK_SECRET",
            StripeAccount::Secondary => "WEBHOOK_SECRET_SECONDARY",
        }
    }
}

impl WebhookSecretSource for ProcessEnvSecrets {
    fn webhook_secret(&self, account: StripeAccount) -> Option<String> {
        std::env::var(Self::env_var(account))
            .ok()
            .filter(|s| !s.is_empty())
    }
}

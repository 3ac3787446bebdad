//! In-memory settings, labs flags and site URL.
//!
//! Backs the settings ports with a key/value map. Used by the binary (seeded
//! from `AppConfig::stripe_settings`) and by tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::ports::{LabsFlags, SettingsProvider, SiteUrlProvider};

/// Settings held in a map, keyed by the persisted settings key names.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettings {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

impl SettingsProvider for InMemorySettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_string(key)
            .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            })
    }
}

/// Labs flags that can be toggled at runtime.
#[derive(Debug, Clone, Default)]
pub struct StaticLabs {
    enabled: Arc<RwLock<HashSet<String>>>,
}

impl StaticLabs {
    pub fn new<S: Into<String>>(flags: impl IntoIterator<Item = S>) -> Self {
        Self {
            enabled: Arc::new(RwLock::new(flags.into_iter().map(Into::into).collect())),
        }
    }

    pub fn enable(&self, flag: &str) {
        self.enabled
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(flag.to_string());
    }

    pub fn disable(&self, flag: &str) {
        self.enabled
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(flag);
    }
}

impl LabsFlags for StaticLabs {
    fn is_set(&self, flag: &str) -> bool {
        self.enabled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(flag)
    }
}

/// A fixed site URL.
#[derive(Debug, Clone)]
pub struct StaticSiteUrl(String);

impl StaticSiteUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

impl SiteUrlProvider for StaticSiteUrl {
    fn site_url(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::StripeAccount;

    #[test]
    fn bool_settings_parse_common_forms() {
        let settings = InMemorySettings::from_pairs([("a", "true"), ("b", "0"), ("c", "maybe")]);
        assert_eq!(settings.get_bool("a"), Some(true));
        assert_eq!(settings.get_bool("b"), Some(false));
        assert_eq!(settings.get_bool("c"), None);
        assert_eq!(settings.get_bool("missing"), None);
    }

    #[test]
    fn updates_are_visible_through_clones() {
        let settings = InMemorySettings::new();
        let view = settings.clone();
        settings.set("stripe_secondary_secret_key", "sk_s");
        settings.set("stripe_secondary_publishable_key", "pk_s");

        assert!(view.account_keys(StripeAccount::Secondary).is_some());

        settings.remove("stripe_secondary_secret_key");
        assert!(view.account_keys(StripeAccount::Secondary).is_none());
    }

    #[test]
    fn labs_toggle_at_runtime() {
        let labs = StaticLabs::new(["stripeAutomaticTax"]);
        assert!(labs.is_set("stripeAutomaticTax"));
        labs.disable("stripeAutomaticTax");
        assert!(!labs.is_set("stripeAutomaticTax"));
    }
}

//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `MEMBERSHIP_BILLING` prefix and nested values use double underscores as separators.
//!
//! Stripe account keys are not part of `AppConfig` proper: they are persisted
//! settings, read through [`crate::ports::SettingsProvider`] and turned into
//! per-account configs by [`StripeConfigResolver`]. `stripe_settings` only
//! seeds the in-memory settings store for the standalone binary.
//!
//! # Example
//!
//! ```no_run
//! use membership_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr().unwrap());
//! ```

mod error;
mod payment;
mod resolver;
mod server;

pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use resolver::{
    ResolvedStripeConfig, StripeConfigResolver, DEFAULT_WEBHOOK_SECRET,
    DEFAULT_WEBHOOK_SECRET_SECONDARY, SECONDARY_WEBHOOK_PATH, WEBHOOK_PATH,
};
pub use server::{Environment, ServerConfig};

use std::collections::HashMap;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, site URL)
    #[serde(default)]
    pub server: ServerConfig,

    /// Payment configuration (Stripe API and checkout behaviour)
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Seed values for persisted settings, keyed by settings key name
    #[serde(default)]
    pub stripe_settings: HashMap<String, String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `MEMBERSHIP_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `MEMBERSHIP_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `MEMBERSHIP_BILLING__PAYMENT__ENABLE_PROMO_CODES=true` -> `payment.enable_promo_codes = true`
    /// - `MEMBERSHIP_BILLING__STRIPE_SETTINGS__STRIPE_PRIMARY_SECRET_KEY=sk_...`
    ///   -> `stripe_settings["stripe_primary_secret_key"]`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MEMBERSHIP_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

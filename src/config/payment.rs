//! Payment configuration

use serde::Deserialize;

use crate::adapters::stripe::DEFAULT_API_BASE_URL;

use super::error::ValidationError;
use super::server::is_absolute_http_url;

/// Payment configuration (Stripe)
///
/// Account keys are not read from here; they live in the persisted settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Offer promotion codes on checkout sessions
    #[serde(default)]
    pub enable_promo_codes: bool,

    /// Stripe API base URL, overridable for stripe-mock
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Reject webhook events whose `livemode` is false
    #[serde(default)]
    pub require_livemode: bool,

    /// Timeout for a single Stripe API call, in seconds
    #[serde(default = "default_client_timeout")]
    pub client_timeout_secs: u64,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_base_url.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__API_BASE_URL"));
        }
        if !is_absolute_http_url(&self.api_base_url) {
            return Err(ValidationError::InvalidApiBaseUrl(self.api_base_url.clone()));
        }
        if self.client_timeout_secs == 0 || self.client_timeout_secs > 300 {
            return Err(ValidationError::InvalidClientTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            enable_promo_codes: false,
            api_base_url: default_api_base_url(),
            require_livemode: false,
            client_timeout_secs: default_client_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_client_timeout() -> u64 {
    80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PaymentConfig::default();
        assert!(!config.enable_promo_codes);
        assert!(!config.require_livemode);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_base_url() {
        let config = PaymentConfig {
            api_base_url: String::new(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("PAYMENT__API_BASE_URL"))
        );
    }

    #[test]
    fn test_validation_relative_base_url() {
        let config = PaymentConfig {
            api_base_url: "api.stripe.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidApiBaseUrl(_))
        ));
    }

    #[test]
    fn test_stripe_mock_base_url_is_accepted() {
        let config = PaymentConfig {
            api_base_url: "http://localhost:12111".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_client_timeout() {
        let config = PaymentConfig {
            client_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidClientTimeout));
    }
}

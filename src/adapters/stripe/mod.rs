//! Stripe adapters.
//!
//! - `StripeApiClient` - reqwest client for one account, built by
//!   `HttpStripeClientFactory`
//! - `StripeAccountManager` - builds and owns the primary/secondary clients
//! - `DualStripeGateway` - fallback reads, routed writes, primary-only creation
//! - `WebhookVerifier` - per-account webhook signature verification
//! - `MockStripeClient` - in-memory client for tests
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod account_manager;
mod client_slot;
mod dual_gateway;
mod fallback;
mod mock_client;
mod stripe_api_client;
mod webhook_signature;

pub use account_manager::StripeAccountManager;
pub use client_slot::{AccountClients, ClientSlot};
pub use dual_gateway::DualStripeGateway;
pub use fallback::lookup_with_fallback;
pub use mock_client::{MethodCall, MockStripeClient, MockStripeClientFactory};
pub use stripe_api_client::{
    HttpStripeClientFactory, StripeApiClient, DEFAULT_API_BASE_URL, STRIPE_API_VERSION,
};
pub use webhook_signature::{
    compute_signature, signature_header, SignatureHeader, SignatureParseError, WebhookVerifier,
    MAX_FUTURE_TOLERANCE_SECS, MAX_TIMESTAMP_AGE_SECS,
};

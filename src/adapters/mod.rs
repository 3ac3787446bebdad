//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `http` - Axum routes for inbound Stripe webhooks
//! - `memory` - In-memory stores and event services
//! - `settings` - Settings, labs flags and site URL backed by a map
//! - `stripe` - Stripe API client, account manager and dual gateway

pub mod http;
pub mod memory;
pub mod settings;
pub mod stripe;

pub use stripe::{DualStripeGateway, HttpStripeClientFactory, StripeAccountManager};

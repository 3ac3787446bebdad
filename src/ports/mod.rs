//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing core and the outside world. Adapters implement these ports.
//!
//! ## Stripe Ports
//!
//! - `StripeClient` - One Stripe account's API client
//! - `StripeClientFactory` - Builds clients from account configs
//!
//! ## Settings Ports
//!
//! - `SettingsProvider` - Persisted settings, with per-account key helpers
//! - `LabsFlags` - Runtime feature flags
//! - `SiteUrlProvider` - Canonical site URL
//! - `WebhookSecretSource` - Webhook signing secrets
//!
//! ## Downstream Ports
//!
//! - `SubscriptionEventHandler`, `InvoiceEventHandler`,
//!   `CheckoutSessionEventHandler` - Webhook event services
//! - `StripeDataStore` - Cached Stripe data cleared on disconnect
//! - `SubscriptionRepository` - Local subscription records

mod settings;
mod stripe_client;
mod stripe_data_store;
mod stripe_types;
mod subscription_repository;
mod webhook_handlers;

pub use settings::{
    settings_key, AccountNames, DualStripeKeys, LabsFlags, ProcessEnvSecrets, SettingsProvider,
    SiteUrlProvider, WebhookSecretSource, AUTOMATIC_TAX_FLAG, DUAL_ACCOUNTS_ENABLED_KEY,
};
pub use stripe_client::{StripeClient, StripeClientFactory};
pub use stripe_data_store::{ClearedStripeData, StoreError, StripeDataStore};
pub use stripe_types::{
    CheckoutSession, Coupon, CreateCheckoutSessionRequest, CreateCouponRequest,
    CreateCustomerRequest, CreatePriceRequest, CreateProductRequest, CreateSetupSessionRequest,
    CreateWebhookEndpointRequest, Customer, DeletedObject, List, ListOptions, Price, Product,
    Recurring, Subscription, SubscriptionItem, SubscriptionItems, SubscriptionStatus,
    UpdateSubscriptionRequest, WebhookEndpoint, WebhookEvent, WebhookEventData, WebhookEventKind,
};
pub use subscription_repository::SubscriptionRepository;
pub use webhook_handlers::{
    CheckoutSessionEventHandler, EventHandlingError, InvoiceEventHandler,
    SubscriptionEventHandler,
};

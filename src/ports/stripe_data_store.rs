//! Locally cached Stripe data.
//!
//! Prices, products, customer links and coupon ids mirror objects that live in
//! Stripe. When the integration is disconnected they no longer refer to
//! anything reachable and must be cleared.

use async_trait::async_trait;
use thiserror::Error;

/// Storage failure in a local repository.
#[derive(Debug, Clone, Error)]
#[error("Storage error: {0}")]
pub struct StoreError(pub String);

/// Counts of rows removed by a clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearedStripeData {
    pub prices: usize,
    pub products: usize,
    pub customer_links: usize,
    pub coupon_ids: usize,
}

/// Access to locally cached Stripe objects.
#[async_trait]
pub trait StripeDataStore: Send + Sync {
    /// Removes every cached Stripe price, product, customer link and coupon id.
    async fn clear_stripe_data(&self) -> Result<ClearedStripeData, StoreError>;
}

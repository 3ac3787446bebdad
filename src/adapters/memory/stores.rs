//! In-memory repositories for development and testing.
//!
//! Not suitable for production: contents are lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::MemberSubscription;
use crate::ports::{ClearedStripeData, StoreError, StripeDataStore, SubscriptionRepository};

#[derive(Debug, Default)]
struct CachedStripeData {
    prices: HashMap<String, String>,
    products: HashMap<String, String>,
    customer_links: HashMap<String, String>,
    coupon_ids: HashMap<String, String>,
}

/// Cached Stripe ids keyed by local id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStripeDataStore {
    data: Arc<RwLock<CachedStripeData>>,
}

impl InMemoryStripeDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn cache_price(&self, local_id: &str, stripe_id: &str) {
        self.data
            .write()
            .await
            .prices
            .insert(local_id.to_string(), stripe_id.to_string());
    }

    pub async fn cache_product(&self, local_id: &str, stripe_id: &str) {
        self.data
            .write()
            .await
            .products
            .insert(local_id.to_string(), stripe_id.to_string());
    }

    pub async fn link_customer(&self, member_id: &str, customer_id: &str) {
        self.data
            .write()
            .await
            .customer_links
            .insert(member_id.to_string(), customer_id.to_string());
    }

    pub async fn cache_coupon(&self, offer_id: &str, coupon_id: &str) {
        self.data
            .write()
            .await
            .coupon_ids
            .insert(offer_id.to_string(), coupon_id.to_string());
    }

    /// Total number of cached entries.
    pub async fn len(&self) -> usize {
        let data = self.data.read().await;
        data.prices.len() + data.products.len() + data.customer_links.len() + data.coupon_ids.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StripeDataStore for InMemoryStripeDataStore {
    async fn clear_stripe_data(&self) -> Result<ClearedStripeData, StoreError> {
        let mut data = self.data.write().await;
        let cleared = ClearedStripeData {
            prices: data.prices.len(),
            products: data.products.len(),
            customer_links: data.customer_links.len(),
            coupon_ids: data.coupon_ids.len(),
        };
        *data = CachedStripeData::default();
        Ok(cleared)
    }
}

/// Subscription records keyed by Stripe subscription id.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    records: Arc<RwLock<HashMap<String, MemberSubscription>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: MemberSubscription) {
        self.records
            .write()
            .await
            .insert(record.subscription_id.clone(), record);
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<MemberSubscription>, StoreError> {
        Ok(self.records.read().await.get(subscription_id).cloned())
    }

    async fn update(&self, subscription: &MemberSubscription) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&subscription.subscription_id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(StoreError(format!(
                "Subscription {} does not exist",
                subscription.subscription_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clear_reports_counts_and_empties_store() {
        let store = InMemoryStripeDataStore::new();
        store.cache_price("tier_1_monthly", "price_1").await;
        store.cache_product("tier_1", "prod_1").await;
        store.link_customer("member_1", "cus_1").await;

        let cleared = store.clear_stripe_data().await.unwrap();

        assert_eq!(cleared.prices, 1);
        assert_eq!(cleared.customer_links, 1);
        assert_eq!(cleared.coupon_ids, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let repo = InMemorySubscriptionRepository::new();
        let record = MemberSubscription::new("ms_1", "m_1", "cus_1", "sub_1");
        assert!(repo.update(&record).await.is_err());

        repo.insert(record.clone()).await;
        assert!(repo.update(&record).await.is_ok());
        assert!(repo.find_by_subscription_id("sub_1").await.unwrap().is_some());
    }
}

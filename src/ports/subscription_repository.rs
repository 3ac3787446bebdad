//! Member subscription repository port.

use async_trait::async_trait;

use crate::domain::billing::MemberSubscription;

use super::stripe_data_store::StoreError;

/// Persistence for local subscription records.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find by Stripe subscription id. Returns `None` if unknown.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<MemberSubscription>, StoreError>;

    async fn update(&self, subscription: &MemberSubscription) -> Result<(), StoreError>;
}

//! CancelSubscriptionHandler - cancels a member's subscription in whichever
//! Stripe account holds it.

use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::adapters::stripe::DualStripeGateway;
use crate::domain::billing::{GatewayError, MemberSubscription, StripeAccount};
use crate::ports::{StoreError, SubscriptionRepository};

/// Command to cancel a subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub subscription_id: String,
    pub reason: Option<String>,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: MemberSubscription,
    /// Account the cancellation was issued against.
    pub account: StripeAccount,
}

#[derive(Debug, Error)]
pub enum CancelSubscriptionError {
    #[error("No local record for subscription {0}")]
    UnknownSubscription(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CancelSubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CancelSubscriptionError::UnknownSubscription(_) => StatusCode::NOT_FOUND,
            CancelSubscriptionError::Gateway(e) => e.status_code(),
            CancelSubscriptionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Handler for cancelling subscriptions across accounts.
///
/// The gateway discovers which account holds the subscription and cancels it
/// there only. The local record is then updated with Stripe's view, including
/// the discovered account.
pub struct CancelSubscriptionHandler {
    gateway: DualStripeGateway,
    repository: Arc<dyn SubscriptionRepository>,
}

impl CancelSubscriptionHandler {
    pub fn new(gateway: DualStripeGateway, repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            gateway,
            repository,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, CancelSubscriptionError> {
        // 1. Find the local record
        let mut record = self
            .repository
            .find_by_subscription_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| CancelSubscriptionError::UnknownSubscription(cmd.subscription_id.clone()))?;

        // 2. Cancel in the account that holds it
        let cancelled = self.gateway.cancel_subscription(&cmd.subscription_id).await?;

        if cancelled.account != record.stripe_account {
            tracing::info!(
                subscription_id = %cmd.subscription_id,
                recorded = %record.stripe_account,
                discovered = %cancelled.account,
                "Subscription found in a different Stripe account than recorded"
            );
        }

        // 3. Persist Stripe's view
        let subscription = &cancelled.resource;
        record.record_cancellation(
            subscription.status.as_str(),
            subscription.cancel_at_period_end,
            subscription.current_period_end,
            cmd.reason,
            cancelled.account,
        );
        self.repository.update(&record).await?;

        Ok(CancelSubscriptionResult {
            subscription: record,
            account: cancelled.account,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::stripe::{MockStripeClient, MockStripeClientFactory};
    use crate::domain::billing::{AccountConfig, DualAccountConfig, PaymentError, StripeKeys};

    fn setup() -> (
        MockStripeClientFactory,
        InMemorySubscriptionRepository,
        CancelSubscriptionHandler,
    ) {
        let factory = MockStripeClientFactory::new();
        let gateway = DualStripeGateway::new(Arc::new(factory.clone()));
        gateway
            .configure(Some(&DualAccountConfig::new(
                Some(AccountConfig::new(
                    StripeAccount::Primary,
                    StripeKeys::new("sk_p", "pk_p"),
                )),
                Some(AccountConfig::new(
                    StripeAccount::Secondary,
                    StripeKeys::new("sk_s", "pk_s"),
                )),
            )))
            .unwrap();
        let repo = InMemorySubscriptionRepository::new();
        let handler = CancelSubscriptionHandler::new(gateway, Arc::new(repo.clone()));
        (factory, repo, handler)
    }

    fn command(id: &str) -> CancelSubscriptionCommand {
        CancelSubscriptionCommand {
            subscription_id: id.to_string(),
            reason: Some("Too expensive".to_string()),
        }
    }

    #[tokio::test]
    async fn cancels_in_secondary_and_records_account() {
        let (factory, repo, handler) = setup();
        factory
            .client(StripeAccount::Secondary)
            .add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));
        repo.insert(MemberSubscription::new("ms_1", "m_1", "cus_1", "sub_1"))
            .await;

        let result = handler.handle(command("sub_1")).await.unwrap();

        assert_eq!(result.account, StripeAccount::Secondary);
        assert_eq!(result.subscription.status, "canceled");
        assert_eq!(result.subscription.stripe_account, StripeAccount::Secondary);
        assert_eq!(
            result.subscription.cancellation_reason.as_deref(),
            Some("Too expensive")
        );

        let stored = repo.find_by_subscription_id("sub_1").await.unwrap().unwrap();
        assert_eq!(stored.stripe_account, StripeAccount::Secondary);

        let primary = factory.client(StripeAccount::Primary);
        assert_eq!(primary.call_count("cancel_subscription"), 0);
        assert_eq!(
            factory
                .client(StripeAccount::Secondary)
                .call_count("cancel_subscription"),
            1
        );
    }

    #[tokio::test]
    async fn unknown_local_record_skips_stripe() {
        let (factory, _repo, handler) = setup();

        let err = handler.handle(command("sub_missing")).await.unwrap_err();

        assert!(matches!(err, CancelSubscriptionError::UnknownSubscription(_)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(factory.client(StripeAccount::Primary).calls().is_empty());
    }

    #[tokio::test]
    async fn subscription_missing_from_stripe_leaves_record_untouched() {
        let (_factory, repo, handler) = setup();
        repo.insert(MemberSubscription::new("ms_1", "m_1", "cus_1", "sub_1"))
            .await;

        let err = handler.handle(command("sub_1")).await.unwrap_err();

        assert!(matches!(err, CancelSubscriptionError::Gateway(ref e) if e.is_not_found()));
        let stored = repo.find_by_subscription_id("sub_1").await.unwrap().unwrap();
        assert_eq!(stored.status, "active");
    }

    #[tokio::test]
    async fn cancel_failure_is_upstream_error() {
        let (factory, repo, handler) = setup();
        let primary = factory.client(StripeAccount::Primary);
        primary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));
        primary.set_method_error("cancel_subscription", PaymentError::network("reset"));
        repo.insert(MemberSubscription::new("ms_1", "m_1", "cus_1", "sub_1"))
            .await;

        let err = handler.handle(command("sub_1")).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            factory
                .client(StripeAccount::Secondary)
                .call_count("cancel_subscription"),
            0
        );
    }
}

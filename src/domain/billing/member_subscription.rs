//! Local member subscription record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::StripeAccount;

/// A member's subscription as stored locally.
///
/// `stripe_account` records which Stripe account holds the remote
/// subscription. Records created before dual-account support default to
/// primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSubscription {
    pub id: String,
    pub member_id: String,
    pub customer_id: String,
    pub subscription_id: String,
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub stripe_account: StripeAccount,
    pub updated_at: DateTime<Utc>,
}

impl MemberSubscription {
    pub fn new(
        id: impl Into<String>,
        member_id: impl Into<String>,
        customer_id: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            member_id: member_id.into(),
            customer_id: customer_id.into(),
            subscription_id: subscription_id.into(),
            status: "active".to_string(),
            cancel_at_period_end: false,
            current_period_end: None,
            cancellation_reason: None,
            stripe_account: StripeAccount::Primary,
            updated_at: Utc::now(),
        }
    }

    pub fn with_account(mut self, account: StripeAccount) -> Self {
        self.stripe_account = account;
        self
    }

    /// Applies the state Stripe returned after a cancellation.
    pub fn record_cancellation(
        &mut self,
        status: &str,
        cancel_at_period_end: bool,
        current_period_end: i64,
        reason: Option<String>,
        account: StripeAccount,
    ) {
        self.status = status.to_string();
        self.cancel_at_period_end = cancel_at_period_end;
        self.current_period_end = DateTime::from_timestamp(current_period_end, 0);
        self.cancellation_reason = reason;
        self.stripe_account = account;
        self.updated_at = Utc::now();
    }
}

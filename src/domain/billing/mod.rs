//! Billing domain module.
//!
//! Types shared by the account manager, the dual gateway and the webhook
//! router.
//!
//! # Module Structure
//!
//! - `account` - `StripeAccount` primary/secondary label
//! - `account_config` - Immutable per-account configuration
//! - `affinity` - Fallback lookup results and per-account outcomes
//! - `errors` - Gateway error taxonomy
//! - `member_subscription` - Local subscription record with its Stripe account
//! - `payment_error` - Errors from a single account's client

mod account;
mod account_config;
mod affinity;
mod errors;
mod member_subscription;
mod payment_error;

pub use account::{StripeAccount, UnknownAccountLabel};
pub use account_config::{
    AccountConfig, CheckoutUrls, DualAccountConfig, LazyFlag, StripeConfiguration, StripeKeys,
};
pub use affinity::{
    AccountAttempt, AccountOutcome, AccountOutcomes, AttemptOutcome, GatewayState, Located,
    Lookup,
};
pub use errors::GatewayError;
pub use member_subscription::MemberSubscription;
pub use payment_error::{PaymentError, PaymentErrorCode};

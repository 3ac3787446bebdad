//! Account affinity: which account holds a resource, discovered per call.

use std::collections::BTreeMap;

use serde::Serialize;

use super::account::StripeAccount;
use super::payment_error::PaymentError;

/// A resource together with the account it was found in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Located<T> {
    pub resource: T,
    pub account: StripeAccount,
}

impl<T> Located<T> {
    pub fn new(resource: T, account: StripeAccount) -> Self {
        Self { resource, account }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Located<U> {
        Located {
            resource: f(self.resource),
            account: self.account,
        }
    }
}

/// Why an account did not produce the resource during a fallback lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The account has no client, or its client is not configured.
    Skipped,
    /// The client was called and failed (including "not found").
    Failed(PaymentError),
}

/// One account's entry in the ordered record of a fallback lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountAttempt {
    pub account: StripeAccount,
    pub outcome: AttemptOutcome,
}

/// Result of a sequential primary-then-secondary lookup.
#[derive(Debug, Clone)]
pub struct Lookup<T> {
    found: Option<Located<T>>,
    misses: Vec<AccountAttempt>,
}

impl<T> Lookup<T> {
    pub fn new() -> Self {
        Self {
            found: None,
            misses: Vec::new(),
        }
    }

    pub fn record_miss(&mut self, account: StripeAccount, outcome: AttemptOutcome) {
        self.misses.push(AccountAttempt { account, outcome });
    }

    pub fn record_hit(&mut self, resource: T, account: StripeAccount) {
        self.found = Some(Located::new(resource, account));
    }

    pub fn is_found(&self) -> bool {
        self.found.is_some()
    }

    /// Accounts that were skipped or failed, in the order they were tried.
    pub fn misses(&self) -> &[AccountAttempt] {
        &self.misses
    }

    /// Number of accounts whose client was actually called and failed.
    pub fn failed_attempts(&self) -> usize {
        self.misses
            .iter()
            .filter(|a| matches!(a.outcome, AttemptOutcome::Failed(_)))
            .count()
    }

    pub fn into_found(self) -> Option<Located<T>> {
        self.found
    }
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-account outcome of a multi-account operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountOutcome<T> {
    Succeeded { result: T },
    Failed { error: String },
}

impl<T> AccountOutcome<T> {
    pub fn from_result(result: Result<T, PaymentError>) -> Self {
        match result {
            Ok(result) => AccountOutcome::Succeeded { result },
            Err(err) => AccountOutcome::Failed {
                error: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AccountOutcome::Succeeded { .. })
    }

    pub fn succeeded(&self) -> Option<&T> {
        match self {
            AccountOutcome::Succeeded { result } => Some(result),
            AccountOutcome::Failed { .. } => None,
        }
    }
}

/// Outcomes keyed by account, iterated primary first.
pub type AccountOutcomes<T> = BTreeMap<StripeAccount, AccountOutcome<T>>;

/// Which accounts currently hold a configured client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    Unconfigured,
    PrimaryOnly,
    SecondaryOnly,
    Dual,
}

impl GatewayState {
    pub fn from_flags(primary: bool, secondary: bool) -> Self {
        match (primary, secondary) {
            (false, false) => GatewayState::Unconfigured,
            (true, false) => GatewayState::PrimaryOnly,
            (false, true) => GatewayState::SecondaryOnly,
            (true, true) => GatewayState::Dual,
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, GatewayState::Unconfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_counts_only_failed_attempts() {
        let mut lookup: Lookup<&str> = Lookup::new();
        lookup.record_miss(StripeAccount::Primary, AttemptOutcome::Skipped);
        lookup.record_miss(
            StripeAccount::Secondary,
            AttemptOutcome::Failed(PaymentError::not_found("Customer", "cus_1")),
        );

        assert!(!lookup.is_found());
        assert_eq!(lookup.failed_attempts(), 1);
        assert_eq!(lookup.misses()[0].account, StripeAccount::Primary);
    }

    #[test]
    fn lookup_hit_yields_located_resource() {
        let mut lookup = Lookup::new();
        lookup.record_hit("cus_1", StripeAccount::Secondary);

        let located = lookup.into_found().unwrap();
        assert_eq!(located.resource, "cus_1");
        assert_eq!(located.account, StripeAccount::Secondary);
    }

    #[test]
    fn outcome_failure_keeps_error_text() {
        let outcome: AccountOutcome<()> =
            AccountOutcome::from_result(Err(PaymentError::network("connection reset")));
        assert!(!outcome.is_success());
        match outcome {
            AccountOutcome::Failed { error } => assert!(error.contains("connection reset")),
            _ => panic!("Expected failure"),
        }
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = AccountOutcome::Succeeded { result: 1 };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["result"], 1);
    }

    #[test]
    fn gateway_state_from_flags() {
        assert_eq!(GatewayState::from_flags(false, false), GatewayState::Unconfigured);
        assert_eq!(GatewayState::from_flags(true, false), GatewayState::PrimaryOnly);
        assert_eq!(GatewayState::from_flags(false, true), GatewayState::SecondaryOnly);
        assert_eq!(GatewayState::from_flags(true, true), GatewayState::Dual);
        assert!(!GatewayState::Unconfigured.is_configured());
        assert!(GatewayState::SecondaryOnly.is_configured());
    }
}

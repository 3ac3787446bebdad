//! Sequential primary-then-secondary lookup.
//!
//! Each account is attempted only after the previous one has fully failed.
//! Nothing here runs attempts concurrently.

use std::future::Future;
use std::sync::Arc;

use crate::domain::billing::{AttemptOutcome, Lookup, PaymentError, StripeAccount};
use crate::ports::StripeClient;

use super::client_slot::AccountClients;

/// Runs `attempt` against each configured account in order, stopping at the
/// first success. Absent or unconfigured accounts are recorded as skipped.
pub async fn lookup_with_fallback<T, F, Fut>(
    clients: &AccountClients,
    resource: &'static str,
    id: &str,
    mut attempt: F,
) -> Lookup<T>
where
    F: FnMut(Arc<dyn StripeClient>) -> Fut,
    Fut: Future<Output = Result<T, PaymentError>>,
{
    let mut lookup = Lookup::new();

    for account in StripeAccount::ALL {
        let Some(client) = clients.configured(account) else {
            lookup.record_miss(account, AttemptOutcome::Skipped);
            continue;
        };

        match attempt(Arc::clone(client)).await {
            Ok(found) => {
                tracing::debug!(account = %account, resource, id, "Found Stripe resource");
                lookup.record_hit(found, account);
                return lookup;
            }
            Err(e) => {
                tracing::warn!(
                    account = %account,
                    resource,
                    id,
                    error = %e,
                    "Stripe lookup failed, trying next account"
                );
                lookup.record_miss(account, AttemptOutcome::Failed(e));
            }
        }
    }

    lookup
}

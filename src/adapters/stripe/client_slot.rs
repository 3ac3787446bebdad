//! The set of live Stripe clients, swapped as a unit.
//!
//! Readers take a snapshot (`Arc<AccountClients>`) and use it for a whole
//! operation, so a reconfiguration in flight is seen either entirely or not at
//! all. Writers replace the snapshot; they never patch one client in place.

use std::sync::{Arc, RwLock};

use crate::domain::billing::{GatewayState, StripeAccount};
use crate::ports::StripeClient;

/// Zero, one or two clients, immutable once built.
#[derive(Clone, Default)]
pub struct AccountClients {
    primary: Option<Arc<dyn StripeClient>>,
    secondary: Option<Arc<dyn StripeClient>>,
}

impl AccountClients {
    pub fn new(
        primary: Option<Arc<dyn StripeClient>>,
        secondary: Option<Arc<dyn StripeClient>>,
    ) -> Self {
        Self { primary, secondary }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The client held for `account`, configured or not.
    pub fn get(&self, account: StripeAccount) -> Option<&Arc<dyn StripeClient>> {
        match account {
            StripeAccount::Primary => self.primary.as_ref(),
            StripeAccount::Secondary => self.secondary.as_ref(),
        }
    }

    /// The client for `account` only if it reports itself configured.
    pub fn configured(&self, account: StripeAccount) -> Option<&Arc<dyn StripeClient>> {
        self.get(account).filter(|client| client.is_configured())
    }

    /// Configured clients in primary-then-secondary order.
    pub fn all(&self) -> Vec<(StripeAccount, Arc<dyn StripeClient>)> {
        StripeAccount::ALL
            .iter()
            .filter_map(|account| {
                self.configured(*account)
                    .map(|client| (*account, Arc::clone(client)))
            })
            .collect()
    }

    pub fn state(&self) -> GatewayState {
        GatewayState::from_flags(
            self.configured(StripeAccount::Primary).is_some(),
            self.configured(StripeAccount::Secondary).is_some(),
        )
    }
}

impl std::fmt::Debug for AccountClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountClients")
            .field("primary", &self.primary.is_some())
            .field("secondary", &self.secondary.is_some())
            .finish()
    }
}

/// Shared holder of the current `AccountClients`.
///
/// Cloning the slot shares it; the account manager and the dual gateway hold
/// clones of the same slot.
#[derive(Clone, Default)]
pub struct ClientSlot {
    current: Arc<RwLock<Arc<AccountClients>>>,
}

impl ClientSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current client set. Holds no lock after returning.
    pub fn snapshot(&self) -> Arc<AccountClients> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replaces the client set in one step.
    pub fn replace(&self, clients: AccountClients) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(clients);
    }

    pub fn clear(&self) {
        self.replace(AccountClients::empty());
    }
}

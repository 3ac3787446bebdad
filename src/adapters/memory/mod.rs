//! In-memory adapters for development and tests.

mod event_log;
mod stores;

pub use event_log::{RecordedEvent, RecordingEventHandler};
pub use stores::{InMemoryStripeDataStore, InMemorySubscriptionRepository};

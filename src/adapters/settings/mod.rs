//! Settings adapters.

mod in_memory;

pub use in_memory::{InMemorySettings, StaticLabs, StaticSiteUrl};

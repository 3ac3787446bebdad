//! Domain layer containing billing types.
//!
//! # Module Organization
//!
//! - `billing` - Account labels, per-account configuration, lookup results
//!   and the gateway error taxonomy

pub mod billing;

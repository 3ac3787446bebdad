//! Membership Billing - Dual-account Stripe gateway
//!
//! This crate connects membership billing to up to two Stripe accounts at
//! once. New resources are always created in the primary account; existing
//! customers and subscriptions are found in whichever account holds them.
//! Webhooks from each account are verified with that account's secret and
//! routed to the event services.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

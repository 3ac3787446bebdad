//! Stripe resource and request types shared by every account client.
//!
//! These model the subset of Stripe objects the gateway routes. Field names
//! follow Stripe's JSON so responses deserialize directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stripe Customer object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    /// Customer email address.
    pub email: Option<String>,

    /// Customer name.
    pub name: Option<String>,

    /// Unix timestamp of creation.
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Whether the customer has been deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// Subscription status as reported by Stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Unpaid,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Check if subscription grants access.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

/// Stripe Subscription object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: String,

    pub status: SubscriptionStatus,

    #[serde(default)]
    pub current_period_start: i64,

    #[serde(default)]
    pub current_period_end: i64,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    pub canceled_at: Option<i64>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub items: SubscriptionItems,
}

impl Subscription {
    /// Price of the first subscription item, if any.
    pub fn first_price(&self) -> Option<&Price> {
        self.items.data.first().map(|item| &item.price)
    }
}

/// Subscription items container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// Individual subscription item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub id: String,
    pub price: Price,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Recurring billing interval on a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurring {
    /// "day", "week", "month" or "year".
    pub interval: String,
    #[serde(default = "default_interval_count")]
    pub interval_count: u32,
}

fn default_interval_count() -> u32 {
    1
}

/// Stripe Price object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub product: Option<String>,
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub currency: String,
    pub recurring: Option<Recurring>,
    #[serde(default)]
    pub active: bool,
    pub nickname: Option<String>,
}

/// Stripe Product object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub description: Option<String>,
}

/// Stripe Checkout Session object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Hosted checkout URL.
    pub url: Option<String>,

    /// Payment mode (payment, setup, subscription).
    pub mode: String,

    pub customer: Option<String>,

    pub subscription: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe Coupon object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub name: Option<String>,
    pub percent_off: Option<f64>,
    pub amount_off: Option<i64>,
    pub currency: Option<String>,
    /// "once", "repeating" or "forever".
    pub duration: String,
    pub duration_in_months: Option<u32>,
}

/// Stripe Webhook Endpoint object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: String,
    pub url: String,
    /// Signing secret, only returned on creation.
    pub secret: Option<String>,
    #[serde(default)]
    pub enabled_events: Vec<String>,
}

/// Response to a delete call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedObject {
    pub id: String,
    pub deleted: bool,
}

/// A page of a Stripe list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Pagination and filtering for list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub starting_after: Option<String>,
    pub active: Option<bool>,
}

impl ListOptions {
    /// Form parameters for the list request.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &self.starting_after {
            params.push(("starting_after", cursor.clone()));
        }
        if let Some(active) = self.active {
            params.push(("active", active.to_string()));
        }
        params
    }
}

/// Request to create a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCustomerRequest {
    pub email: String,
    pub name: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Request to change a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSubscriptionRequest {
    pub cancel_at_period_end: Option<bool>,
    /// Replace the first item's price.
    pub price_id: Option<String>,
    pub proration_behavior: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Request to create a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Request to create a price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePriceRequest {
    pub product: String,
    pub unit_amount: i64,
    pub currency: String,
    /// Recurring interval; `None` for one-off prices.
    pub interval: Option<String>,
    pub nickname: Option<String>,
    pub active: bool,
}

/// Request to create a subscription checkout session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCheckoutSessionRequest {
    pub price_id: String,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub coupon_id: Option<String>,
    pub trial_days: Option<u32>,
    /// Overrides the account's configured success URL.
    pub success_url: Option<String>,
    /// Overrides the account's configured cancel URL.
    pub cancel_url: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Request to create a setup session for updating billing details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSetupSessionRequest {
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub currency: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Request to create a coupon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateCouponRequest {
    pub name: Option<String>,
    pub percent_off: Option<f64>,
    pub amount_off: Option<i64>,
    pub currency: Option<String>,
    pub duration: String,
    pub duration_in_months: Option<u32>,
}

/// Request to register a webhook endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateWebhookEndpointRequest {
    pub url: String,
    pub enabled_events: Vec<String>,
    pub api_version: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook events
// ════════════════════════════════════════════════════════════════════════════════

/// A verified Stripe webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub livemode: bool,

    pub data: WebhookEventData,
}

/// Event data container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,

    /// Previous values for updated fields (on update events).
    pub previous_attributes: Option<serde_json::Value>,
}

/// Families of webhook events routed to distinct services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventKind {
    Subscription,
    Invoice,
    CheckoutSession,
    Other,
}

impl WebhookEvent {
    pub fn kind(&self) -> WebhookEventKind {
        match self.event_type.as_str() {
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => WebhookEventKind::Subscription,
            "invoice.paid" | "invoice.payment_succeeded" | "invoice.payment_failed" => {
                WebhookEventKind::Invoice
            }
            "checkout.session.completed" => WebhookEventKind::CheckoutSession,
            _ => WebhookEventKind::Other,
        }
    }
}

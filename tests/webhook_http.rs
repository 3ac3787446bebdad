//! Integration tests for the Stripe webhook HTTP endpoints.
//!
//! These tests drive the full router through `oneshot`:
//! 1. Deliveries to each endpoint are verified with that account's secret
//! 2. Verified events reach the matching event service
//! 3. Missing or bad signatures are rejected with 400

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use membership_billing::adapters::http::{app_router, WebhookAppState};
use membership_billing::adapters::memory::RecordingEventHandler;
use membership_billing::adapters::stripe::{signature_header, DualStripeGateway, MockStripeClientFactory};
use membership_billing::application::RouteWebhookHandler;
use membership_billing::domain::billing::{
    AccountConfig, DualAccountConfig, StripeAccount, StripeKeys,
};

const PRIMARY_SECRET: &str = "whsec_primary_test";
const SECONDARY_SECRET: &str = "whsec_secondary_test";
const PRIMARY_PATH: &str = "/members/webhooks/stripe/";
const SECONDARY_PATH: &str = "/members/webhooks/stripe/secondary/";

// =============================================================================
// Test Infrastructure
// =============================================================================

fn account(account: StripeAccount, secret: &str) -> AccountConfig {
    AccountConfig::new(account, StripeKeys::new("sk_test_x", "pk_test_x"))
        .with_webhook(secret, "https://example.com/members/webhooks/stripe/")
}

fn app(secondary: bool) -> (Router, RecordingEventHandler) {
    let gateway = DualStripeGateway::new(Arc::new(MockStripeClientFactory::new()));
    gateway
        .configure(Some(&DualAccountConfig::new(
            Some(account(StripeAccount::Primary, PRIMARY_SECRET)),
            secondary.then(|| account(StripeAccount::Secondary, SECONDARY_SECRET)),
        )))
        .unwrap();

    let recorder = RecordingEventHandler::new();
    let events = Arc::new(recorder.clone());
    let router = Arc::new(RouteWebhookHandler::new(
        gateway.clone(),
        events.clone(),
        events.clone(),
        events,
    ));
    let app = app_router(WebhookAppState { router, gateway }, Duration::from_secs(5));
    (app, recorder)
}

fn payload(event_type: &str) -> Vec<u8> {
    json!({
        "id": "evt_test_1",
        "type": event_type,
        "created": 1_700_000_000,
        "livemode": false,
        "data": { "object": { "id": "sub_1", "customer": "cus_1" } }
    })
    .to_string()
    .into_bytes()
}

fn signed_request(path: &str, secret: &str, body: Vec<u8>) -> Request<Body> {
    let signature = signature_header(secret, chrono::Utc::now().timestamp(), &body).unwrap();
    Request::builder()
        .method("POST")
        .uri(path)
        .header("Stripe-Signature", signature)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn primary_endpoint_accepts_primary_signature() {
    let (app, recorder) = app(true);

    let response = app
        .oneshot(signed_request(
            PRIMARY_PATH,
            PRIMARY_SECRET,
            payload("customer.subscription.deleted"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["received"], true);
    assert_eq!(body["dispatched_to"], "subscription");

    let events = recorder.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].account, StripeAccount::Primary);
    assert_eq!(events[0].event_type, "customer.subscription.deleted");
}

#[tokio::test]
async fn secondary_endpoint_routes_to_secondary_account() {
    let (app, recorder) = app(true);

    let response = app
        .oneshot(signed_request(
            SECONDARY_PATH,
            SECONDARY_SECRET,
            payload("checkout.session.completed"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = recorder.events().await;
    assert_eq!(events[0].account, StripeAccount::Secondary);
    assert_eq!(events[0].service, "checkout");
}

#[tokio::test]
async fn secondary_endpoint_rejects_primary_signature() {
    let (app, recorder) = app(true);

    let response = app
        .oneshot(signed_request(
            SECONDARY_PATH,
            PRIMARY_SECRET,
            payload("invoice.paid"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], "INVALID_WEBHOOK");
    assert!(recorder.events().await.is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_bad_request() {
    let (app, _) = app(true);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(PRIMARY_PATH)
                .body(Body::from(payload("invoice.paid")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], "MISSING_SIGNATURE");
}

#[tokio::test]
async fn secondary_endpoint_without_secondary_account_is_unavailable() {
    let (app, _) = app(false);

    let response = app
        .oneshot(signed_request(
            SECONDARY_PATH,
            SECONDARY_SECRET,
            payload("invoice.paid"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], "STRIPE_NOT_CONFIGURED");
}

#[tokio::test]
async fn unhandled_event_type_is_acknowledged() {
    let (app, recorder) = app(true);

    let response = app
        .oneshot(signed_request(
            PRIMARY_PATH,
            PRIMARY_SECRET,
            payload("charge.refunded"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["dispatched_to"], "ignored");
    assert!(recorder.events().await.is_empty());
}

#[tokio::test]
async fn health_reports_gateway_state() {
    let (app, _) = app(false);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["state"], "primary_only");
    assert_eq!(body["configured"], true);
    assert_eq!(body["test_env"], true);
}

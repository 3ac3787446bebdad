//! End-to-end scenarios for the account manager and the dual gateway.
//!
//! Each test wires the real manager/gateway to mock Stripe clients and checks
//! which account every remote call lands in.

use std::sync::Arc;

use membership_billing::adapters::settings::InMemorySettings;
use membership_billing::adapters::stripe::{
    DualStripeGateway, MockStripeClient, MockStripeClientFactory, StripeAccountManager,
};
use membership_billing::domain::billing::{
    AccountConfig, AccountOutcome, DualAccountConfig, GatewayState, PaymentError, StripeAccount,
    StripeConfiguration, StripeKeys,
};
use membership_billing::ports::{
    CreateCustomerRequest, CreateWebhookEndpointRequest, WebhookEndpoint,
    DUAL_ACCOUNTS_ENABLED_KEY,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn account(account: StripeAccount, secret: &str, public: &str) -> AccountConfig {
    AccountConfig::new(account, StripeKeys::new(secret, public))
}

fn dual_config() -> DualAccountConfig {
    DualAccountConfig::new(
        Some(account(StripeAccount::Primary, "sk_p", "pk_p")),
        Some(account(StripeAccount::Secondary, "sk_s", "pk_s")),
    )
}

fn dual_gateway() -> (DualStripeGateway, MockStripeClient, MockStripeClient) {
    let factory = MockStripeClientFactory::new();
    let gateway = DualStripeGateway::new(Arc::new(factory.clone()));
    gateway.configure(Some(&dual_config())).unwrap();
    (
        gateway,
        factory.client(StripeAccount::Primary),
        factory.client(StripeAccount::Secondary),
    )
}

fn dual_settings() -> InMemorySettings {
    InMemorySettings::from_pairs([
        (DUAL_ACCOUNTS_ENABLED_KEY, "true"),
        ("stripe_primary_secret_key", "sk_p"),
        ("stripe_primary_publishable_key", "pk_p"),
        ("stripe_secondary_secret_key", "sk_s"),
        ("stripe_secondary_publishable_key", "pk_s"),
    ])
}

fn endpoint(id: &str) -> WebhookEndpoint {
    WebhookEndpoint {
        id: id.to_string(),
        url: "https://example.com/members/webhooks/stripe/".to_string(),
        secret: None,
        enabled_events: vec![],
    }
}

// =============================================================================
// Fallback order
// =============================================================================

#[tokio::test]
async fn resource_only_in_secondary_is_found_after_one_primary_miss() {
    let factory = MockStripeClientFactory::new();
    let gateway = DualStripeGateway::new(Arc::new(factory.clone()));
    gateway.configure(Some(&dual_config())).unwrap();
    factory
        .client(StripeAccount::Secondary)
        .add_customer(MockStripeClient::customer("cus_1", "member@example.com"));

    let found = gateway.get_customer("cus_1").await.unwrap();

    assert_eq!(found.account, StripeAccount::Secondary);
    assert_eq!(found.resource.id, "cus_1");

    let lookups: Vec<StripeAccount> = factory
        .journal()
        .into_iter()
        .filter(|call| call.method == "get_customer")
        .map(|call| call.account)
        .collect();
    assert_eq!(lookups, vec![StripeAccount::Primary, StripeAccount::Secondary]);
}

#[tokio::test]
async fn primary_timeout_falls_back_to_secondary() {
    let (gateway, primary, secondary) = dual_gateway();
    primary.set_method_error("get_subscription", PaymentError::timeout("deadline exceeded"));
    secondary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));

    let found = gateway.get_subscription("sub_1").await.unwrap();

    assert_eq!(found.account, StripeAccount::Secondary);
}

#[tokio::test]
async fn primary_hit_never_consults_secondary() {
    let (gateway, primary, secondary) = dual_gateway();
    primary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));
    secondary.add_subscription(MockStripeClient::subscription("sub_1", "cus_other"));

    let found = gateway.get_subscription("sub_1").await.unwrap();

    assert_eq!(found.account, StripeAccount::Primary);
    assert_eq!(found.resource.customer, "cus_1");
    assert!(secondary.calls().is_empty());
}

#[tokio::test]
async fn missing_everywhere_is_not_found() {
    let (gateway, _, _) = dual_gateway();

    let err = gateway.get_subscription("sub_missing").await.unwrap_err();

    assert!(err.is_not_found());
}

// =============================================================================
// No duplicate writes
// =============================================================================

#[tokio::test]
async fn cancel_goes_only_to_the_discovered_account() {
    let (gateway, primary, secondary) = dual_gateway();
    secondary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));

    let cancelled = gateway.cancel_subscription("sub_1").await.unwrap();

    assert_eq!(cancelled.account, StripeAccount::Secondary);
    assert_eq!(primary.call_count("cancel_subscription"), 0);
    assert_eq!(secondary.call_count("cancel_subscription"), 1);
}

#[tokio::test]
async fn failed_cancel_is_not_retried_in_other_account() {
    let (gateway, primary, secondary) = dual_gateway();
    primary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));
    primary.set_method_error("cancel_subscription", PaymentError::network("connection reset"));
    secondary.add_subscription(MockStripeClient::subscription("sub_1", "cus_1"));

    let err = gateway.cancel_subscription("sub_1").await.unwrap_err();

    assert!(!err.is_not_found());
    assert_eq!(primary.call_count("cancel_subscription"), 1);
    assert!(secondary.calls().is_empty());
}

#[tokio::test]
async fn cancel_of_unknown_subscription_issues_no_write() {
    let (gateway, primary, secondary) = dual_gateway();

    let err = gateway.cancel_subscription("sub_missing").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(primary.call_count("cancel_subscription"), 0);
    assert_eq!(secondary.call_count("cancel_subscription"), 0);
}

// =============================================================================
// Creation is primary-only
// =============================================================================

#[tokio::test]
async fn create_customer_uses_primary_only() {
    let (gateway, primary, secondary) = dual_gateway();

    gateway
        .create_customer(CreateCustomerRequest {
            email: "new@example.com".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(primary.call_count("create_customer"), 1);
    assert!(secondary.calls().is_empty());
}

#[tokio::test]
async fn create_customer_without_primary_is_configuration_error() {
    let factory = MockStripeClientFactory::new();
    let gateway = DualStripeGateway::new(Arc::new(factory.clone()));
    gateway
        .configure(Some(&DualAccountConfig::new(
            None,
            Some(account(StripeAccount::Secondary, "sk_s", "pk_s")),
        )))
        .unwrap();

    let err = gateway
        .create_customer(CreateCustomerRequest::default())
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(factory.client(StripeAccount::Secondary).calls().is_empty());
}

// =============================================================================
// Unconfigured is not an error
// =============================================================================

#[test]
fn legacy_mode_without_keys_is_quietly_unconfigured() {
    let factory = MockStripeClientFactory::new();
    let manager = StripeAccountManager::new(
        Arc::new(InMemorySettings::new()),
        Arc::new(factory.clone()),
    );

    let state = manager
        .configure(&StripeConfiguration::Legacy(account(
            StripeAccount::Primary,
            "",
            "",
        )))
        .unwrap();

    assert_eq!(state, GatewayState::Unconfigured);
    assert!(!manager.is_configured());
    assert!(factory.builds().is_empty());
}

// =============================================================================
// Best-effort deletion
// =============================================================================

#[tokio::test]
async fn delete_without_account_reports_both_outcomes() {
    let (gateway, primary, secondary) = dual_gateway();
    primary.set_method_error(
        "delete_webhook_endpoint",
        PaymentError::authentication("Invalid API key"),
    );
    secondary.add_webhook_endpoint(endpoint("we_1"));

    let outcomes = gateway.delete_webhook_endpoint("we_1", None).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        outcomes.get(&StripeAccount::Primary),
        Some(AccountOutcome::Failed { .. })
    ));
    assert!(outcomes[&StripeAccount::Secondary].is_success());
    assert_eq!(secondary.call_count("delete_webhook_endpoint"), 1);
}

#[tokio::test]
async fn delete_with_explicit_account_touches_only_that_account() {
    let (gateway, primary, secondary) = dual_gateway();
    secondary.add_webhook_endpoint(endpoint("we_1"));

    let outcomes = gateway
        .delete_webhook_endpoint("we_1", Some(StripeAccount::Secondary))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(primary.calls().is_empty());
}

#[tokio::test]
async fn create_endpoint_skips_unconfigured_accounts() {
    let factory = MockStripeClientFactory::new();
    let gateway = DualStripeGateway::new(Arc::new(factory.clone()));
    gateway
        .configure(Some(&DualAccountConfig::new(
            Some(account(StripeAccount::Primary, "sk_p", "pk_p")),
            None,
        )))
        .unwrap();

    let outcomes = gateway
        .create_webhook_endpoint(CreateWebhookEndpointRequest {
            url: "https://example.com/members/webhooks/stripe/".to_string(),
            enabled_events: vec!["invoice.paid".to_string()],
            api_version: None,
        })
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[&StripeAccount::Primary].is_success());
    assert!(!outcomes.contains_key(&StripeAccount::Secondary));
}

// =============================================================================
// Idempotent disconnect
// =============================================================================

#[test]
fn disconnect_twice_leaves_gateway_unconfigured() {
    let (gateway, _, _) = dual_gateway();
    assert_eq!(gateway.state(), GatewayState::Dual);

    gateway.disconnect();
    assert!(!gateway.configured());
    gateway.disconnect();
    assert!(!gateway.configured());
    assert_eq!(gateway.state(), GatewayState::Unconfigured);
}

#[test]
fn configure_with_nothing_unconfigures() {
    let (gateway, _, _) = dual_gateway();

    let state = gateway.configure(None).unwrap();

    assert_eq!(state, GatewayState::Unconfigured);
}

// =============================================================================
// Dual configuration end to end
// =============================================================================

#[tokio::test]
async fn dual_manager_finds_subscription_in_secondary() {
    let factory = MockStripeClientFactory::new();
    let manager = StripeAccountManager::new(Arc::new(dual_settings()), Arc::new(factory.clone()));
    manager
        .configure(&StripeConfiguration::Dual(dual_config()))
        .unwrap();

    let primary = factory.client(StripeAccount::Primary);
    let secondary = factory.client(StripeAccount::Secondary);
    secondary.add_subscription(MockStripeClient::subscription("sub_123", "cus_1"));

    let found = manager
        .get_subscription_with_fallback("sub_123")
        .await
        .unwrap();

    assert_eq!(found.account, StripeAccount::Secondary);
    assert_eq!(found.resource.id, "sub_123");
    assert_eq!(primary.call_count("get_subscription"), 1);

    // The gateway shares the manager's clients.
    let via_gateway = manager.gateway().get_subscription("sub_123").await.unwrap();
    assert_eq!(via_gateway.account, StripeAccount::Secondary);
}

#[tokio::test]
async fn failed_reconfigure_drops_previous_clients() {
    let factory = MockStripeClientFactory::new();
    let manager = StripeAccountManager::new(Arc::new(dual_settings()), Arc::new(factory.clone()));
    manager
        .configure(&StripeConfiguration::Dual(dual_config()))
        .unwrap();
    assert_eq!(manager.state(), GatewayState::Dual);

    factory.fail_builds_for(StripeAccount::Secondary, PaymentError::provider("boom"));
    assert!(manager
        .configure(&StripeConfiguration::Dual(dual_config()))
        .is_err());

    assert_eq!(manager.state(), GatewayState::Unconfigured);
    assert!(manager.primary_client().is_none());
}

// =============================================================================
// Legacy single account
// =============================================================================

#[tokio::test]
async fn legacy_configuration_never_calls_secondary() {
    let factory = MockStripeClientFactory::new();
    let manager = StripeAccountManager::new(
        Arc::new(InMemorySettings::new()),
        Arc::new(factory.clone()),
    );

    let state = manager
        .configure(&StripeConfiguration::Legacy(account(
            StripeAccount::Primary,
            "sk",
            "pk",
        )))
        .unwrap();
    assert_eq!(state, GatewayState::PrimaryOnly);

    assert!(manager.get_customer_with_fallback("cus_missing").await.is_none());
    assert_eq!(factory.client(StripeAccount::Primary).call_count("get_customer"), 1);
    assert!(factory.client(StripeAccount::Secondary).calls().is_empty());
}

//! Membership billing service.
//!
//! Resolves the Stripe account configuration from settings, builds the
//! primary and secondary clients, and serves the webhook endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use membership_billing::adapters::http::{app_router, WebhookAppState};
use membership_billing::adapters::memory::{InMemoryStripeDataStore, RecordingEventHandler};
use membership_billing::adapters::settings::{InMemorySettings, StaticLabs, StaticSiteUrl};
use membership_billing::adapters::stripe::{HttpStripeClientFactory, StripeAccountManager};
use membership_billing::application::{RouteWebhookHandler, StripeService};
use membership_billing::config::{AppConfig, ServerConfig, StripeConfigResolver};
use membership_billing::ports::ProcessEnvSecrets;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server);

    tracing::info!(
        environment = ?config.server.environment,
        site_url = %config.server.site_url,
        "Starting membership billing service"
    );

    // Settings and Stripe clients
    let settings = Arc::new(InMemorySettings::from_pairs(config.stripe_settings.clone()));
    let factory = HttpStripeClientFactory::new(config.payment.api_base_url.clone())
        .with_timeout(Duration::from_secs(config.payment.client_timeout_secs))?
        .with_require_livemode(config.payment.require_livemode);
    let manager = Arc::new(StripeAccountManager::new(settings.clone(), Arc::new(factory)));
    let service = StripeService::new(manager, Arc::new(InMemoryStripeDataStore::new()));

    let resolver = StripeConfigResolver::new(
        settings,
        Arc::new(StaticLabs::default()),
        Arc::new(StaticSiteUrl::new(config.server.site_url.clone())),
        Arc::new(ProcessEnvSecrets),
        config.server.environment,
        config.payment.enable_promo_codes,
    );
    match resolver.resolve()? {
        Some(resolved) => {
            service.configure(resolved.into_configuration())?;
            service.connect();
        }
        None => tracing::warn!("No Stripe keys configured, webhooks will be rejected"),
    }

    // Webhook routing
    let events = Arc::new(RecordingEventHandler::new());
    let gateway = service.gateway();
    let router = Arc::new(RouteWebhookHandler::new(
        gateway.clone(),
        events.clone(),
        events.clone(),
        events,
    ));
    let app = app_router(
        WebhookAppState { router, gateway },
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

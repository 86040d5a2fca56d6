//! Contract Hub Backend
//!
//! An integration backend stitching a payment processor, an e-signature
//! provider, and a document provider around flat-file contract and account
//! records.

mod accounts;
mod api;
mod clients;
mod config;
mod contracts;
mod errors;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use accounts::AccountRegistry;
use clients::{
    AdobeSignClient, GoogleDriveClient, HttpRenderClient, PageRenderer, PaymentProcessor,
    StripeClient,
};
use config::Config;
use contracts::ContractLifecycle;
use store::{AccountStore, ContractStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ContractLifecycle>,
    pub registry: Arc<AccountRegistry>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub renderer: Arc<dyn PageRenderer>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Contract Hub Backend");
    tracing::info!("Data directory: {:?}", config.data_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.payments_webhook_secret.is_none() {
        tracing::warn!(
            "No payment webhook secret configured (HUB_PAYMENTS_WEBHOOK_SECRET). Webhook events will be rejected!"
        );
    }

    // Seed the flat-file collections on first boot
    let contract_store = ContractStore::new(config.contracts_path());
    contract_store.init().await?;
    let account_store = AccountStore::new(config.accounts_path());
    account_store.init().await?;

    // Collaborator clients share the immutable config, built once here
    let payments: Arc<dyn PaymentProcessor> = Arc::new(StripeClient::new(&config));
    let signatures = Arc::new(AdobeSignClient::new(&config));
    let documents = Arc::new(GoogleDriveClient::new(&config));
    let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderClient::new(&config));

    // Point the signature provider's callback at us; a failure here only
    // degrades webhook delivery, not the service.
    if let Err(e) = signatures.register_webhook().await {
        tracing::warn!("Failed to register agreement webhook: {}", e);
    }

    let lifecycle = Arc::new(ContractLifecycle::new(
        contract_store,
        documents,
        signatures,
    ));
    let registry = Arc::new(AccountRegistry::new(
        account_store,
        payments.clone(),
        config.cleanup_pace,
        config.cleanup_page_size,
    ));

    // Create application state
    let state = AppState {
        lifecycle,
        registry,
        payments,
        renderer,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Payment-account routes
    let stripe_routes = Router::new()
        .route("/create-account", post(api::create_account))
        .route("/create-account-link", post(api::create_account_link))
        .route("/create-login-link", post(api::create_login_link))
        .route("/account", get(api::get_account))
        .route("/account/{account_id}", delete(api::delete_account))
        .route("/account/{account_id}/balance", get(api::get_account_balance))
        .route("/account/{account_id}/transfers", get(api::list_transfers))
        .route("/create-funding-payment", post(api::create_funding_payment))
        .route(
            "/create-influencer-payment",
            post(api::create_influencer_payment),
        )
        .route("/create-payout", post(api::create_payout))
        .route("/accounts", get(api::list_accounts))
        .route("/cleanup/summary", get(api::cleanup_summary))
        .route("/cleanup/all", delete(api::cleanup_all))
        .route("/cleanup/by-domain", delete(api::cleanup_by_domain))
        .route("/webhook", post(api::payments_webhook));

    // Contract lifecycle routes
    let contract_routes = Router::new()
        .route("/contracts", get(api::get_contract))
        .route("/upload-contract", post(api::upload_contract))
        .route("/update-contract", post(api::update_contract))
        .route(
            "/upload-contract-for-signature",
            post(api::upload_contract_for_signature),
        )
        .route(
            "/adobe-webhook",
            get(api::adobe_webhook_challenge).post(api::adobe_webhook_event),
        )
        .route("/export-to-pdf", post(api::export_to_pdf));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(contract_routes)
        .nest("/stripe", stripe_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;

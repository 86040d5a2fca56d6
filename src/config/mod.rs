//! Configuration module for the Contract Hub backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! The resulting `Config` is built once at startup and shared immutably; nothing
//! in a request handler may mutate collaborator configuration.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the flat-file collections
    pub data_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Payment processor API secret key
    pub payments_secret_key: String,
    /// Payment processor API base URL
    pub payments_api_base: String,
    /// Shared secret for verifying payment webhook signatures
    pub payments_webhook_secret: Option<String>,
    /// Platform fee taken on payment intents, in basis points
    pub platform_fee_bps: u32,
    /// Onboarding refresh URL for account links
    pub onboarding_refresh_url: String,
    /// Onboarding return URL for account links
    pub onboarding_return_url: String,

    /// Signature provider integration key
    pub signature_integration_key: String,
    /// Signature provider discovery base URL
    pub signature_api_base: String,
    /// Email of the first, ordered signer (the contract participant)
    pub participant_signer_email: String,
    /// Counter-signing operator email (second, ordered signer)
    pub countersigner_email: String,
    /// Public URL the signature provider calls back on agreement events
    pub signature_webhook_url: Option<String>,

    /// Document provider OAuth bearer token (supplied by the deployment)
    pub documents_access_token: String,
    /// Folder the generated documents are filed under
    pub documents_folder_id: String,
    /// Domain granted writer access on generated documents
    pub documents_share_domain: Option<String>,
    /// Placeholder sentence stripped from documents before export
    pub document_anchor_text: String,

    /// Headless rendering service endpoint
    pub render_service_url: String,

    /// Name stamped into the disconnect audit fields
    pub operator_name: String,

    /// Deadline applied to collaborator calls
    pub upstream_timeout: Duration,
    /// Deadline applied to page rendering (long but bounded)
    pub render_timeout: Duration,
    /// Pause between successive external deletions during bulk cleanup
    pub cleanup_pace: Duration,
    /// Page size used when iterating the processor's account listing
    pub cleanup_page_size: u32,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let data_dir = env_or("HUB_DATA_DIR", "./data").into();

        let bind_addr = env_or("HUB_BIND_ADDR", "127.0.0.1:8080")
            .parse()
            .expect("Invalid HUB_BIND_ADDR format");

        let log_level = env_or("HUB_LOG_LEVEL", "info");

        let upstream_timeout_secs = env_or("HUB_UPSTREAM_TIMEOUT_SECS", "30")
            .parse()
            .expect("Invalid HUB_UPSTREAM_TIMEOUT_SECS");
        let render_timeout_secs = env_or("HUB_RENDER_TIMEOUT_SECS", "120")
            .parse()
            .expect("Invalid HUB_RENDER_TIMEOUT_SECS");
        let cleanup_pace_ms = env_or("HUB_CLEANUP_PACE_MS", "250")
            .parse()
            .expect("Invalid HUB_CLEANUP_PACE_MS");
        let cleanup_page_size = env_or("HUB_CLEANUP_PAGE_SIZE", "100")
            .parse()
            .expect("Invalid HUB_CLEANUP_PAGE_SIZE");
        let platform_fee_bps = env_or("HUB_PLATFORM_FEE_BPS", "290")
            .parse()
            .expect("Invalid HUB_PLATFORM_FEE_BPS");

        Self {
            data_dir,
            bind_addr,
            log_level,
            payments_secret_key: env_or("HUB_PAYMENTS_SECRET_KEY", ""),
            payments_api_base: env_or("HUB_PAYMENTS_API_BASE", "https://api.stripe.com"),
            payments_webhook_secret: env::var("HUB_PAYMENTS_WEBHOOK_SECRET").ok(),
            platform_fee_bps,
            onboarding_refresh_url: env_or(
                "HUB_ONBOARDING_REFRESH_URL",
                "http://localhost:5173/settings/payments",
            ),
            onboarding_return_url: env_or(
                "HUB_ONBOARDING_RETURN_URL",
                "http://localhost:5173/settings/payments",
            ),
            signature_integration_key: env_or("HUB_SIGNATURE_INTEGRATION_KEY", ""),
            signature_api_base: env_or("HUB_SIGNATURE_API_BASE", "https://api.adobesign.com"),
            // TODO: derive the participant signer from the contract record once
            // participant emails are synced from the main platform.
            participant_signer_email: env_or("HUB_PARTICIPANT_SIGNER_EMAIL", ""),
            countersigner_email: env_or("HUB_COUNTERSIGNER_EMAIL", "contracts@fohr.co"),
            signature_webhook_url: env::var("HUB_SIGNATURE_WEBHOOK_URL").ok(),
            documents_access_token: env_or("HUB_DOCUMENTS_ACCESS_TOKEN", ""),
            documents_folder_id: env_or("HUB_DOCUMENTS_FOLDER_ID", ""),
            documents_share_domain: env::var("HUB_DOCUMENTS_SHARE_DOMAIN").ok(),
            document_anchor_text: env_or(
                "HUB_DOCUMENT_ANCHOR_TEXT",
                "Accept changes and mark as ready for review by Fohr",
            ),
            render_service_url: env_or("HUB_RENDER_SERVICE_URL", "http://127.0.0.1:3001/render"),
            operator_name: env_or("HUB_OPERATOR_NAME", "operator"),
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            render_timeout: Duration::from_secs(render_timeout_secs),
            cleanup_pace: Duration::from_millis(cleanup_pace_ms),
            cleanup_page_size,
        }
    }

    /// Path of the contracts collection file.
    pub fn contracts_path(&self) -> PathBuf {
        self.data_dir.join("contracts.json")
    }

    /// Path of the accounts collection file.
    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join("accounts.json")
    }
}

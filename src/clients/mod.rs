//! External collaborator clients.
//!
//! The core consumes collaborators through the traits defined here; the
//! concrete implementations speak HTTP via `reqwest`. Every outbound call
//! carries an explicit deadline, and failures map into
//! `AppError::Upstream` with the failing service and a timeout/transport/
//! status kind.

mod documents;
mod payments;
mod renderer;
mod signatures;

pub use documents::*;
pub use payments::*;
pub use renderer::*;
pub use signatures::*;

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AppError;

/// Identifiers and link for a freshly generated document.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub doc_id: String,
    pub doc_url: String,
}

/// Result of handing a document to the signature provider.
#[derive(Debug, Clone)]
pub struct AgreementSubmission {
    pub agreement_id: String,
    /// Provider response minus the id, passed through to the caller.
    pub provider: Value,
}

/// One page of the payment processor's connected-account listing.
#[derive(Debug, Clone)]
pub struct AccountPage {
    pub accounts: Vec<ListedAccount>,
    pub has_more: bool,
}

/// A connected account as seen in the processor's listing.
#[derive(Debug, Clone)]
pub struct ListedAccount {
    pub id: String,
    pub email: Option<String>,
}

/// Whether a connect account belongs to the brand or to a creator. The two
/// are onboarded with different business types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Brand,
    Creator,
}

/// Profile used to open a connect account.
#[derive(Debug, Clone)]
pub struct ConnectProfile {
    pub email: String,
    pub name: Option<String>,
    pub kind: AccountKind,
}

/// Document generation and export collaborator.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Turn a source document URL into an editable, shared document.
    async fn create_document(
        &self,
        source_url: &str,
        participant_name: &str,
    ) -> Result<GeneratedDocument, AppError>;

    /// Render the current document to a PDF artifact on local disk.
    /// The caller owns (and deletes) the returned file.
    async fn export_pdf(&self, doc_id: &str) -> Result<PathBuf, AppError>;
}

/// E-signature collaborator.
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// Upload the artifact and open an agreement with the ordered signer list.
    async fn send_for_signature(
        &self,
        pdf_path: &std::path::Path,
    ) -> Result<AgreementSubmission, AppError>;

    /// Live agreement state, enriched with signing or signed-document URLs
    /// depending on where the agreement stands.
    async fn get_agreement(&self, agreement_id: &str) -> Result<Value, AppError>;
}

/// Payment processor collaborator.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_connect_account(&self, profile: &ConnectProfile) -> Result<Value, AppError>;
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<Value, AppError>;
    async fn create_login_link(&self, account_id: &str) -> Result<Value, AppError>;
    async fn get_account(&self, account_id: &str) -> Result<Value, AppError>;
    async fn get_balance(&self, account_id: &str) -> Result<Value, AppError>;
    async fn create_funding_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        brand_account_id: &str,
        metadata: Option<&Value>,
    ) -> Result<Value, AppError>;
    async fn create_influencer_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        influencer_account_id: &str,
        brand_account_id: &str,
        metadata: Option<&Value>,
    ) -> Result<Value, AppError>;
    async fn create_payout(
        &self,
        amount: i64,
        currency: &str,
        account_id: &str,
        metadata: Option<&Value>,
    ) -> Result<Value, AppError>;
    async fn list_transfers(
        &self,
        account_id: &str,
        limit: u32,
        starting_after: Option<&str>,
    ) -> Result<Value, AppError>;
    async fn list_accounts(
        &self,
        limit: u32,
        starting_after: Option<&str>,
    ) -> Result<AccountPage, AppError>;
    async fn delete_account(&self, account_id: &str) -> Result<Value, AppError>;
}

/// Headless page rendering collaborator.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render the page behind `url` (authenticated by `token`) into a
    /// paginated PDF and return its path.
    async fn render_page(&self, url: &str, token: &str) -> Result<PathBuf, AppError>;
}

/// Fail on non-success statuses, keeping the response body for diagnostics.
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::upstream_status(service, status, body))
}

/// Read a checked response as JSON.
pub(crate) async fn read_json(
    service: &'static str,
    response: reqwest::Response,
) -> Result<Value, AppError> {
    check_status(service, response)
        .await?
        .json()
        .await
        .map_err(|e| AppError::upstream(service, e))
}

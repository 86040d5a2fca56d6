//! Brand and creator payment-account records.

use serde::{Deserialize, Serialize};

/// The single brand record. `account_id` is null while disconnected; the
/// disconnect audit pair is set together or null together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandAccount {
    pub name: String,
    pub email: String,
    pub account_id: Option<String>,
    pub disconnected_by: Option<String>,
    pub disconnected_on: Option<String>,
}

/// A creator record, keyed by email within the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorAccount {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    pub account_id: Option<String>,
    pub disconnected_by: Option<String>,
    pub disconnected_on: Option<String>,
}

/// Fields applied when linking or unlinking a processor account.
#[derive(Debug, Clone)]
pub struct AccountLinkUpdate {
    pub account_id: Option<String>,
    pub disconnected_by: Option<String>,
    pub disconnected_on: Option<String>,
}

impl AccountLinkUpdate {
    /// A freshly connected account: id set, audit pair cleared.
    pub fn connected(account_id: String) -> Self {
        Self {
            account_id: Some(account_id),
            disconnected_by: None,
            disconnected_on: None,
        }
    }

    /// A disconnected account: id cleared, audit pair stamped.
    pub fn disconnected(actor: String, when: String) -> Self {
        Self {
            account_id: None,
            disconnected_by: Some(actor),
            disconnected_on: Some(when),
        }
    }
}

/// Request body for creating a connect account. Omitting `email` targets
/// the brand record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountLinkRequest {
    pub account_id: String,
    pub refresh_url: String,
    pub return_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoginLinkRequest {
    pub account_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFundingPaymentRequest {
    pub amount: i64,
    pub currency: String,
    pub brand_account_id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInfluencerPaymentRequest {
    pub amount: i64,
    pub currency: String,
    pub influencer_account_id: String,
    pub brand_account_id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayoutRequest {
    pub amount: i64,
    pub currency: String,
    pub account_id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Body for the delete-all cleanup route.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupAllRequest {
    #[serde(default)]
    pub confirm: Option<String>,
}

/// Body for the delete-by-domain cleanup route.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupByDomainRequest {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub confirm: Option<String>,
}

/// One external account observed during a cleanup pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupCandidate {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Outcome of a bulk cleanup run. Failures never abort remaining items;
/// both sides accumulate independently.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted: Vec<CleanupCandidate>,
    pub failed: Vec<CleanupFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupFailure {
    pub account_id: String,
    pub error: String,
}

//! Contract model: one participant's document-signature workflow.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a contract. The set is closed and transitions are
/// validated; arbitrary status strings are rejected at deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContractStatus {
    #[serde(rename = "pending_changes")]
    PendingChanges,
    #[serde(rename = "pending_fohr_to_initiate_signatures")]
    PendingInitiation,
    #[serde(rename = "out_for_signature")]
    OutForSignature,
    #[serde(rename = "signed")]
    Signed,
    #[serde(rename = "completed")]
    Completed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::PendingChanges => "pending_changes",
            ContractStatus::PendingInitiation => "pending_fohr_to_initiate_signatures",
            ContractStatus::OutForSignature => "out_for_signature",
            ContractStatus::Signed => "signed",
            ContractStatus::Completed => "completed",
        }
    }

    /// Whether moving from `self` to `next` is allowed by the lifecycle:
    /// pending_changes → pending_fohr_to_initiate_signatures → out_for_signature
    /// → signed | completed.
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        matches!(
            (self, next),
            (PendingChanges, PendingInitiation)
                | (PendingInitiation, OutForSignature)
                | (OutForSignature, Signed)
                | (OutForSignature, Completed)
        )
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant's contract record as persisted in the contracts collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub participant_id: i64,
    pub doc_id: String,
    pub doc_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement_id: Option<String>,
    pub status: ContractStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

/// Request body for creating a contract document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    pub document_url: String,
    pub participant_name: String,
    pub participant_id: i64,
    #[serde(default)]
    pub campaign_id: Option<String>,
}

/// Request body for patching a contract's status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractRequest {
    pub participant_id: i64,
    pub status: ContractStatus,
    #[serde(default)]
    pub agreement_id: Option<String>,
}

/// Request body for sending a contract out for signature.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendForSignatureRequest {
    pub participant_id: i64,
}

/// Contract enriched with the live agreement state. Read-through only,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractWithAgreement {
    #[serde(flatten)]
    pub contract: Contract,
    pub agreement: Option<serde_json::Value>,
}

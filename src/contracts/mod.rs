//! Contract lifecycle controller.
//!
//! Orchestrates the document → signature → status pipeline over the record
//! store and the document/signature collaborators. Status transitions follow
//! a closed table; external calls happen before any local mutation, so a
//! failed provider call leaves the record at its prior status.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::clients::{AgreementSubmission, DocumentProvider, SignatureProvider};
use crate::errors::AppError;
use crate::models::{Contract, ContractStatus, ContractWithAgreement, UpdateContractRequest};
use crate::store::ContractStore;

pub struct ContractLifecycle {
    store: ContractStore,
    documents: Arc<dyn DocumentProvider>,
    signatures: Arc<dyn SignatureProvider>,
}

/// What `send_for_signature` hands back to the caller.
#[derive(Debug, Clone)]
pub struct SignatureDispatch {
    pub status: ContractStatus,
    pub provider: Value,
}

impl ContractLifecycle {
    pub fn new(
        store: ContractStore,
        documents: Arc<dyn DocumentProvider>,
        signatures: Arc<dyn SignatureProvider>,
    ) -> Self {
        Self {
            store,
            documents,
            signatures,
        }
    }

    pub fn store(&self) -> &ContractStore {
        &self.store
    }

    /// Generate the participant's document and record the contract at
    /// `pending_changes`. No record is created when generation fails.
    pub async fn create_contract_document(
        &self,
        document_url: &str,
        participant_name: &str,
        participant_id: i64,
        campaign_id: Option<String>,
    ) -> Result<Contract, AppError> {
        let document = self
            .documents
            .create_document(document_url, participant_name)
            .await?;

        let contract = Contract {
            participant_id,
            doc_id: document.doc_id,
            doc_url: document.doc_url,
            agreement_id: None,
            status: ContractStatus::PendingChanges,
            campaign_id,
        };
        self.store.upsert(contract.clone()).await?;

        tracing::info!(
            "Created contract document {} for participant {}",
            contract.doc_id,
            participant_id
        );
        Ok(contract)
    }

    /// Patch the contract's status (and accompanying agreement id), rejecting
    /// transitions the lifecycle table does not allow.
    pub async fn update_status(&self, update: &UpdateContractRequest) -> Result<Contract, AppError> {
        let next = update.status;
        let agreement_id = update.agreement_id.clone();

        self.store
            .update(update.participant_id, move |contract| {
                if !contract.status.can_transition_to(next) {
                    return Err(AppError::InvalidTransition {
                        from: contract.status.to_string(),
                        to: next.to_string(),
                    });
                }
                contract.status = next;
                if let Some(agreement_id) = agreement_id {
                    contract.agreement_id = Some(agreement_id);
                }
                Ok(())
            })
            .await
    }

    /// Export the contract's document, hand the artifact to the signature
    /// provider, and only then move the record to `out_for_signature`.
    /// The temp artifact is deleted exactly once, success or failure.
    pub async fn send_for_signature(
        &self,
        participant_id: i64,
    ) -> Result<SignatureDispatch, AppError> {
        let contract = self
            .store
            .find(participant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No contract for participant {}", participant_id))
            })?;

        // Reject before any external work; the transition is re-checked under
        // the write lock when persisting.
        if !contract
            .status
            .can_transition_to(ContractStatus::OutForSignature)
        {
            return Err(AppError::InvalidTransition {
                from: contract.status.to_string(),
                to: ContractStatus::OutForSignature.to_string(),
            });
        }

        let pdf_path = self.documents.export_pdf(&contract.doc_id).await?;

        let submission = self.dispatch_and_cleanup(&pdf_path).await?;

        // Persist strictly after the provider accepted the agreement.
        let agreement_id = submission.agreement_id.clone();
        let updated = self
            .store
            .update(participant_id, move |contract| {
                if !contract
                    .status
                    .can_transition_to(ContractStatus::OutForSignature)
                {
                    return Err(AppError::InvalidTransition {
                        from: contract.status.to_string(),
                        to: ContractStatus::OutForSignature.to_string(),
                    });
                }
                contract.status = ContractStatus::OutForSignature;
                contract.agreement_id = Some(agreement_id);
                Ok(())
            })
            .await?;

        tracing::info!(
            "Contract for participant {} sent for signature as agreement {}",
            participant_id,
            submission.agreement_id
        );
        Ok(SignatureDispatch {
            status: updated.status,
            provider: submission.provider,
        })
    }

    async fn dispatch_and_cleanup(
        &self,
        pdf_path: &Path,
    ) -> Result<AgreementSubmission, AppError> {
        let result = self.signatures.send_for_signature(pdf_path).await;
        if let Err(e) = tokio::fs::remove_file(pdf_path).await {
            tracing::warn!("Failed to delete artifact {}: {}", pdf_path.display(), e);
        }
        result
    }

    /// The contract merged with its live agreement state. Returns `None`
    /// without touching the signature provider when no contract exists; the
    /// merged result is never persisted.
    pub async fn get_contract_with_agreement(
        &self,
        participant_id: i64,
    ) -> Result<Option<ContractWithAgreement>, AppError> {
        let Some(contract) = self.store.find(participant_id).await? else {
            return Ok(None);
        };

        let agreement = match &contract.agreement_id {
            Some(agreement_id) => Some(self.signatures.get_agreement(agreement_id).await?),
            None => None,
        };

        Ok(Some(ContractWithAgreement {
            contract,
            agreement,
        }))
    }
}

//! Contract lifecycle endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiResult;
use crate::errors::AppError;
use crate::models::{
    ContractWithAgreement, CreateContractRequest, SendForSignatureRequest, UpdateContractRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractQuery {
    pub participant_id: i64,
}

/// GET /contracts?participantId=<int> - Contract merged with live agreement
/// state, or JSON null when the participant has none.
pub async fn get_contract(
    State(state): State<AppState>,
    Query(query): Query<ContractQuery>,
) -> ApiResult<Json<Option<ContractWithAgreement>>> {
    let contract = state
        .lifecycle
        .get_contract_with_agreement(query.participant_id)
        .await?;
    Ok(Json(contract))
}

/// POST /upload-contract - Generate the participant's contract document.
pub async fn upload_contract(
    State(state): State<AppState>,
    Json(request): Json<CreateContractRequest>,
) -> ApiResult<Json<Value>> {
    if request.document_url.trim().is_empty() {
        return Err(AppError::Validation("documentUrl is required".to_string()));
    }
    if request.participant_name.trim().is_empty() {
        return Err(AppError::Validation(
            "participantName is required".to_string(),
        ));
    }

    let contract = state
        .lifecycle
        .create_contract_document(
            &request.document_url,
            &request.participant_name,
            request.participant_id,
            request.campaign_id,
        )
        .await?;

    Ok(Json(json!({
        "message": "Contract document created successfully",
        "docUrl": contract.doc_url,
    })))
}

/// POST /update-contract - Patch the contract's status.
pub async fn update_contract(
    State(state): State<AppState>,
    Json(request): Json<UpdateContractRequest>,
) -> ApiResult<StatusCode> {
    state.lifecycle.update_status(&request).await?;
    Ok(StatusCode::OK)
}

/// POST /upload-contract-for-signature - Export the document and open an
/// agreement with the signature provider.
pub async fn upload_contract_for_signature(
    State(state): State<AppState>,
    Json(request): Json<SendForSignatureRequest>,
) -> ApiResult<Json<Value>> {
    let dispatch = state
        .lifecycle
        .send_for_signature(request.participant_id)
        .await?;

    let mut body = match dispatch.provider {
        Value::Object(map) => Value::Object(map),
        other => json!({ "provider": other }),
    };
    if let Some(map) = body.as_object_mut() {
        map.insert("status".to_string(), json!(dispatch.status));
    }
    Ok(Json(body))
}

//! Payment-account endpoints, mounted under `/stripe`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiResult;
use crate::clients::{verify_webhook_signature, SIGNATURE_HEADER};
use crate::errors::AppError;
use crate::models::{
    CleanupAllRequest, CleanupByDomainRequest, CreateAccountLinkRequest, CreateAccountRequest,
    CreateFundingPaymentRequest, CreateInfluencerPaymentRequest, CreateLoginLinkRequest,
    CreatePayoutRequest,
};
use crate::AppState;

/// Confirmation tokens the destructive cleanup routes demand.
const CONFIRM_DELETE_ALL: &str = "DELETE_ALL_ACCOUNTS";
const CONFIRM_DELETE_BY_DOMAIN: &str = "DELETE_BY_DOMAIN";

/// POST /stripe/create-account - Open a connect account. No email targets
/// the brand record, otherwise the creator with that email.
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> ApiResult<Json<Value>> {
    let connected = state
        .registry
        .connect(
            request.email.as_deref(),
            request.name.as_deref(),
            &state.config.onboarding_refresh_url,
            &state.config.onboarding_return_url,
        )
        .await?;

    Ok(Json(json!({
        "accountId": connected.account_id,
        "url": connected.onboarding_url,
    })))
}

/// POST /stripe/create-account-link - Fresh onboarding link for an account.
pub async fn create_account_link(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountLinkRequest>,
) -> ApiResult<Json<Value>> {
    let link = state
        .payments
        .create_account_link(
            &request.account_id,
            &request.refresh_url,
            &request.return_url,
        )
        .await?;
    Ok(Json(json!({ "url": link["url"] })))
}

/// POST /stripe/create-login-link - Dashboard login link for an onboarded
/// account.
pub async fn create_login_link(
    State(state): State<AppState>,
    Json(request): Json<CreateLoginLinkRequest>,
) -> ApiResult<Json<Value>> {
    let link = state.payments.create_login_link(&request.account_id).await?;
    Ok(Json(json!({ "url": link["url"] })))
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub email: Option<String>,
}

/// GET /stripe/account - Processor-side account for the brand, or for the
/// creator selected by ?email=.
pub async fn get_account(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Json<Value>> {
    let view = state.registry.account_view(query.email.as_deref()).await?;
    Ok(Json(view))
}

/// GET /stripe/account/{accountId}/balance
pub async fn get_account_balance(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let balance = state.payments.get_balance(&account_id).await?;
    Ok(Json(json!({ "balance": balance })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub starting_after: Option<String>,
}

/// GET /stripe/account/{accountId}/transfers
pub async fn list_transfers(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let transfers = state
        .payments
        .list_transfers(
            &account_id,
            query.limit.unwrap_or(10),
            query.starting_after.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "transfers": transfers })))
}

/// POST /stripe/create-funding-payment - Payment intent funding the brand
/// account.
pub async fn create_funding_payment(
    State(state): State<AppState>,
    Json(request): Json<CreateFundingPaymentRequest>,
) -> ApiResult<Json<Value>> {
    let intent = state
        .payments
        .create_funding_payment_intent(
            request.amount,
            &request.currency,
            &request.brand_account_id,
            request.metadata.as_ref(),
        )
        .await?;

    Ok(Json(json!({
        "clientSecret": intent["client_secret"],
        "paymentIntentId": intent["id"],
    })))
}

/// POST /stripe/create-influencer-payment - Payment intent paying a creator.
pub async fn create_influencer_payment(
    State(state): State<AppState>,
    Json(request): Json<CreateInfluencerPaymentRequest>,
) -> ApiResult<Json<Value>> {
    let intent = state
        .payments
        .create_influencer_payment_intent(
            request.amount,
            &request.currency,
            &request.influencer_account_id,
            &request.brand_account_id,
            request.metadata.as_ref(),
        )
        .await?;

    Ok(Json(json!({
        "clientSecret": intent["client_secret"],
        "paymentIntentId": intent["id"],
    })))
}

/// POST /stripe/create-payout - Payout on a connected account.
pub async fn create_payout(
    State(state): State<AppState>,
    Json(request): Json<CreatePayoutRequest>,
) -> ApiResult<Json<Value>> {
    let payout = state
        .payments
        .create_payout(
            request.amount,
            &request.currency,
            &request.account_id,
            request.metadata.as_ref(),
        )
        .await?;
    Ok(Json(json!({ "payout": payout })))
}

/// GET /stripe/accounts - Page through all connected accounts.
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let page = state
        .payments
        .list_accounts(query.limit.unwrap_or(100), query.starting_after.as_deref())
        .await?;

    let accounts: Vec<Value> = page
        .accounts
        .iter()
        .map(|a| json!({ "id": a.id, "email": a.email }))
        .collect();
    Ok(Json(json!({ "accounts": accounts, "hasMore": page.has_more })))
}

/// GET /stripe/cleanup/summary - What a cleanup pass would look at, with no
/// deletions.
pub async fn cleanup_summary(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let summary = state
        .registry
        .cleanup_summary(query.limit.unwrap_or(100), query.starting_after.as_deref())
        .await?;
    Ok(Json(json!({ "summary": summary })))
}

/// DELETE /stripe/account/{accountId} - Delete one connected account and
/// unlink the local record holding it.
pub async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let deleted = state
        .registry
        .disconnect(&account_id, &state.config.operator_name)
        .await?;
    Ok(Json(json!({
        "message": "Account deleted successfully",
        "account": deleted,
    })))
}

/// DELETE /stripe/cleanup/all - Delete every connected account. Demands an
/// explicit confirmation token; a mismatch performs zero deletions.
pub async fn cleanup_all(
    State(state): State<AppState>,
    Json(request): Json<CleanupAllRequest>,
) -> ApiResult<Json<Value>> {
    if request.confirm.as_deref() != Some(CONFIRM_DELETE_ALL) {
        return Err(AppError::Validation(format!(
            "Confirmation required. Send {{ \"confirm\": \"{}\" }} in the request body.",
            CONFIRM_DELETE_ALL
        )));
    }

    let results = state
        .registry
        .cleanup_all(&state.config.operator_name)
        .await?;
    Ok(Json(json!({
        "message": "Account cleanup completed",
        "results": results,
    })))
}

/// DELETE /stripe/cleanup/by-domain - Delete connected accounts whose email
/// matches a domain suffix. Same confirmation rules as delete-all.
pub async fn cleanup_by_domain(
    State(state): State<AppState>,
    Json(request): Json<CleanupByDomainRequest>,
) -> ApiResult<Json<Value>> {
    let Some(domain) = request.domain.as_deref().filter(|d| !d.trim().is_empty()) else {
        return Err(AppError::Validation(
            "Domain parameter required (e.g., '@test.com')".to_string(),
        ));
    };
    if request.confirm.as_deref() != Some(CONFIRM_DELETE_BY_DOMAIN) {
        return Err(AppError::Validation(format!(
            "Confirmation required. Send {{ \"confirm\": \"{}\" }} in the request body.",
            CONFIRM_DELETE_BY_DOMAIN
        )));
    }

    let results = state
        .registry
        .cleanup_by_domain(domain, &state.config.operator_name)
        .await?;
    Ok(Json(json!({
        "message": format!("Account cleanup completed for domain: {}", domain),
        "results": results,
    })))
}

/// POST /stripe/webhook - Signature-verified event receiver.
pub async fn payments_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let Some(secret) = &state.config.payments_webhook_secret else {
        return Err(AppError::BadRequest(
            "Webhook verification is not configured".to_string(),
        ));
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".to_string()))?;

    let event = verify_webhook_signature(&body, signature, secret)?;

    match event["type"].as_str() {
        Some("account.updated") => {
            tracing::info!("Account updated: {}", event["data"]["object"]["id"]);
        }
        Some("payment_intent.succeeded") => {
            tracing::info!("Payment succeeded: {}", event["data"]["object"]["id"]);
        }
        Some("transfer.created") => {
            tracing::info!("Transfer created: {}", event["data"]["object"]["id"]);
        }
        other => {
            tracing::debug!("Unhandled event type {:?}", other);
        }
    }

    Ok(Json(json!({ "received": true })))
}

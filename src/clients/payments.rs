//! Payment processor client (Stripe Connect style REST API).

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{read_json, AccountKind, AccountPage, ConnectProfile, ListedAccount, PaymentProcessor};
use crate::config::Config;
use crate::errors::AppError;

const SERVICE: &str = "payments";

pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    platform_fee_bps: u32,
    timeout: Duration,
}

impl StripeClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.payments_api_base.trim_end_matches('/').to_string(),
            secret_key: config.payments_secret_key.clone(),
            platform_fee_bps: config.platform_fee_bps,
            timeout: config.upstream_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    fn platform_fee(&self, amount: i64) -> i64 {
        (amount * self.platform_fee_bps as i64 + 5_000) / 10_000
    }

    async fn post_form(&self, path: &str, params: &[(String, String)]) -> Result<Value, AppError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.secret_key)
            .timeout(self.timeout)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    fn push_metadata(params: &mut Vec<(String, String)>, metadata: Option<&Value>) {
        let Some(Value::Object(map)) = metadata else {
            return;
        };
        for (key, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            params.push((format!("metadata[{}]", key), rendered));
        }
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_connect_account(&self, profile: &ConnectProfile) -> Result<Value, AppError> {
        let mut params = vec![
            ("type".to_string(), "express".to_string()),
            ("email".to_string(), profile.email.clone()),
            (
                "capabilities[card_payments][requested]".to_string(),
                "true".to_string(),
            ),
            (
                "capabilities[transfers][requested]".to_string(),
                "true".to_string(),
            ),
            (
                "settings[payouts][schedule][interval]".to_string(),
                "daily".to_string(),
            ),
        ];

        // Brands onboard as a company, creators as individuals.
        match profile.kind {
            AccountKind::Brand => {
                params.push(("business_type".to_string(), "company".to_string()));
                if let Some(name) = &profile.name {
                    params.push(("company[name]".to_string(), name.clone()));
                }
            }
            AccountKind::Creator => {
                params.push(("business_type".to_string(), "individual".to_string()));
            }
        }

        self.post_form("accounts", &params).await
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<Value, AppError> {
        let params = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), refresh_url.to_string()),
            ("return_url".to_string(), return_url.to_string()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];
        self.post_form("account_links", &params).await
    }

    async fn create_login_link(&self, account_id: &str) -> Result<Value, AppError> {
        self.post_form(&format!("accounts/{}/login_links", account_id), &[])
            .await
    }

    async fn get_account(&self, account_id: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .get(self.url(&format!("accounts/{}", account_id)))
            .bearer_auth(&self.secret_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    async fn get_balance(&self, account_id: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .get(self.url("balance"))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Account", account_id)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    async fn create_funding_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        brand_account_id: &str,
        metadata: Option<&Value>,
    ) -> Result<Value, AppError> {
        let mut params = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
            (
                "application_fee_amount".to_string(),
                self.platform_fee(amount).to_string(),
            ),
            (
                "transfer_data[destination]".to_string(),
                brand_account_id.to_string(),
            ),
            ("metadata[type]".to_string(), "account_funding".to_string()),
        ];
        Self::push_metadata(&mut params, metadata);
        self.post_form("payment_intents", &params).await
    }

    async fn create_influencer_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        influencer_account_id: &str,
        brand_account_id: &str,
        metadata: Option<&Value>,
    ) -> Result<Value, AppError> {
        let mut params = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
            (
                "application_fee_amount".to_string(),
                self.platform_fee(amount).to_string(),
            ),
            (
                "transfer_data[destination]".to_string(),
                influencer_account_id.to_string(),
            ),
            (
                "metadata[type]".to_string(),
                "influencer_payment".to_string(),
            ),
            (
                "metadata[brand_account]".to_string(),
                brand_account_id.to_string(),
            ),
            (
                "metadata[influencer_account]".to_string(),
                influencer_account_id.to_string(),
            ),
        ];
        Self::push_metadata(&mut params, metadata);
        self.post_form("payment_intents", &params).await
    }

    async fn create_payout(
        &self,
        amount: i64,
        currency: &str,
        account_id: &str,
        metadata: Option<&Value>,
    ) -> Result<Value, AppError> {
        let mut params = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
        ];
        Self::push_metadata(&mut params, metadata);

        // Payouts run on the connected account itself.
        let response = self
            .http
            .post(self.url("payouts"))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Account", account_id)
            .timeout(self.timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    async fn list_transfers(
        &self,
        account_id: &str,
        limit: u32,
        starting_after: Option<&str>,
    ) -> Result<Value, AppError> {
        let mut query = vec![
            ("destination".to_string(), account_id.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(cursor) = starting_after {
            query.push(("starting_after".to_string(), cursor.to_string()));
        }

        let response = self
            .http
            .get(self.url("transfers"))
            .bearer_auth(&self.secret_key)
            .timeout(self.timeout)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    async fn list_accounts(
        &self,
        limit: u32,
        starting_after: Option<&str>,
    ) -> Result<AccountPage, AppError> {
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(cursor) = starting_after {
            query.push(("starting_after".to_string(), cursor.to_string()));
        }

        let response = self
            .http
            .get(self.url("accounts"))
            .bearer_auth(&self.secret_key)
            .timeout(self.timeout)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        let body = read_json(SERVICE, response).await?;

        let accounts = body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(ListedAccount {
                            id: item["id"].as_str()?.to_string(),
                            email: item["email"].as_str().map(|s| s.to_string()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(AccountPage {
            accounts,
            has_more: body["has_more"].as_bool().unwrap_or(false),
        })
    }

    async fn delete_account(&self, account_id: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .delete(self.url(&format!("accounts/{}", account_id)))
            .bearer_auth(&self.secret_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }
}

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verify a webhook payload against its signature header and return the
/// parsed event. The header format is `t=<unix>,v1=<hex>[,v1=<hex>...]`;
/// the signed payload is `"{t}.{body}"`. Comparison is constant-time and
/// the diagnostic never includes the secret.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> Result<Value, AppError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::BadRequest("Signature header missing timestamp".into()))?;
    if candidates.is_empty() {
        return Err(AppError::BadRequest("Signature header missing v1 signature".into()));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::BadRequest("Webhook secret is not usable as a key".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    let matched = candidates
        .iter()
        .any(|candidate| expected.as_bytes().ct_eq(candidate.as_bytes()).into());
    if !matched {
        return Err(AppError::BadRequest("Webhook signature mismatch".into()));
    }

    serde_json::from_slice(payload)
        .map_err(|e| AppError::BadRequest(format!("Webhook payload is not JSON: {}", e)))
}

/// Compute the signature header value for a payload. Test helper for the
/// verification path.
#[cfg(test)]
pub fn sign_webhook_payload(payload: &[u8], timestamp: &str, secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

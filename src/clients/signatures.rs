//! E-signature provider client (Adobe Sign style REST API).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::{check_status, read_json, AgreementSubmission, SignatureProvider};
use crate::config::Config;
use crate::errors::AppError;

const SERVICE: &str = "signature";

pub struct AdobeSignClient {
    http: reqwest::Client,
    discovery_base: String,
    integration_key: String,
    participant_signer_email: String,
    countersigner_email: String,
    webhook_url: Option<String>,
    timeout: Duration,
    /// API access point from base-URI discovery. Resolved once per process
    /// and immutable afterwards; request handlers never touch it.
    access_point: OnceCell<String>,
}

impl AdobeSignClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            discovery_base: config.signature_api_base.trim_end_matches('/').to_string(),
            integration_key: config.signature_integration_key.clone(),
            participant_signer_email: config.participant_signer_email.clone(),
            countersigner_email: config.countersigner_email.clone(),
            webhook_url: config.signature_webhook_url.clone(),
            timeout: config.upstream_timeout,
            access_point: OnceCell::new(),
        }
    }

    /// Discover (once) the tenant's API access point. Returned with a
    /// trailing slash by the provider.
    async fn access_point(&self) -> Result<&str, AppError> {
        self.access_point
            .get_or_try_init(|| async {
                let response = self
                    .http
                    .get(format!("{}/api/rest/v6/baseUris", self.discovery_base))
                    .bearer_auth(&self.integration_key)
                    .timeout(self.timeout)
                    .send()
                    .await
                    .map_err(|e| AppError::upstream(SERVICE, e))?;
                let body = read_json(SERVICE, response).await?;
                body["apiAccessPoint"]
                    .as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::Upstream {
                        service: SERVICE,
                        kind: crate::errors::UpstreamKind::Transport,
                        message: "Base URI discovery returned no apiAccessPoint".into(),
                    })
            })
            .await
            .map(|s| s.as_str())
    }

    async fn api_url(&self, path: &str) -> Result<String, AppError> {
        Ok(format!("{}api/rest/v6/{}", self.access_point().await?, path))
    }

    /// Upload the artifact as a transient document, returning its id.
    async fn upload_transient(&self, pdf_path: &Path) -> Result<String, AppError> {
        let bytes = tokio::fs::read(pdf_path).await.map_err(|e| {
            AppError::Storage(format!(
                "Cannot read artifact {}: {}",
                pdf_path.display(),
                e
            ))
        })?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("document.pdf")
            .mime_str("application/pdf")
            .map_err(|_| AppError::BadRequest("Invalid artifact mime type".into()))?;
        let form = reqwest::multipart::Form::new().part("File", part);

        let url = self.api_url("transientDocuments").await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.integration_key)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        let body = read_json(SERVICE, response).await?;

        body["transientDocumentId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Upstream {
                service: SERVICE,
                kind: crate::errors::UpstreamKind::Transport,
                message: "Transient upload returned no transientDocumentId".into(),
            })
    }

    async fn get_json(&self, path: &str) -> Result<Value, AppError> {
        let url = self.api_url(path).await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.integration_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, AppError> {
        let url = self.api_url(path).await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.integration_key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    /// All webhooks registered for this integration, inactive ones included.
    pub async fn list_webhooks(&self) -> Result<Vec<Value>, AppError> {
        let body = self.get_json("webhooks?showInActive=true").await?;
        Ok(body["userWebhookList"]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<(), AppError> {
        let url = self.api_url(&format!("webhooks/{}", webhook_id)).await?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.integration_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        check_status(SERVICE, response).await?;
        Ok(())
    }

    /// Replace any existing webhook registrations with one pointing at the
    /// configured callback URL. No-op when no callback URL is configured.
    pub async fn register_webhook(&self) -> Result<(), AppError> {
        let Some(callback_url) = &self.webhook_url else {
            return Ok(());
        };

        for webhook in self.list_webhooks().await? {
            if let Some(id) = webhook["id"].as_str() {
                if let Err(e) = self.delete_webhook(id).await {
                    tracing::warn!("Failed to delete stale webhook {}: {}", id, e);
                }
            }
        }

        let payload = json!({
            "name": "Agreement Webhook",
            "scope": "ACCOUNT",
            "state": "ACTIVE",
            "webhookUrlInfo": { "url": callback_url },
            "webhookSubscriptionEvents": [
                "AGREEMENT_CREATED",
                "AGREEMENT_ACTION_COMPLETED",
                "AGREEMENT_EMAIL_VIEWED",
                "AGREEMENT_WORKFLOW_COMPLETED",
            ],
            "webhookConditionalParams": {
                "webhookInfoInResponse": { "agreement": true, "participant": true }
            },
        });

        self.post_json("webhooks", &payload).await?;
        tracing::info!("Agreement webhook registered at {}", callback_url);
        Ok(())
    }
}

#[async_trait]
impl SignatureProvider for AdobeSignClient {
    async fn send_for_signature(&self, pdf_path: &Path) -> Result<AgreementSubmission, AppError> {
        let transient_document_id = self.upload_transient(pdf_path).await?;

        let payload = json!({
            "fileInfos": [{ "transientDocumentId": transient_document_id }],
            "name": "Agreement to be signed",
            "participantSetsInfo": [
                {
                    "memberInfos": [{ "email": self.participant_signer_email }],
                    "order": 1,
                    "role": "SIGNER",
                    "name": "signer_one",
                },
                {
                    "memberInfos": [{ "email": self.countersigner_email }],
                    "order": 2,
                    "role": "SIGNER",
                    "name": "signer_two",
                },
            ],
            "signatureType": "ESIGN",
            "state": "IN_PROCESS",
        });

        let mut body = self.post_json("agreements", &payload).await?;
        let agreement_id = body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Upstream {
                service: SERVICE,
                kind: crate::errors::UpstreamKind::Transport,
                message: "Agreement creation returned no id".into(),
            })?;

        // Echo back the freshly created agreement state alongside the
        // creation response, minus the id the caller gets separately.
        let agreement = self.get_agreement(&agreement_id).await?;
        if let Some(map) = body.as_object_mut() {
            map.remove("id");
            map.insert("agreement".to_string(), agreement);
        }

        Ok(AgreementSubmission {
            agreement_id,
            provider: body,
        })
    }

    async fn get_agreement(&self, agreement_id: &str) -> Result<Value, AppError> {
        let mut agreement = self.get_json(&format!("agreements/{}", agreement_id)).await?;

        match agreement["status"].as_str() {
            Some("OUT_FOR_SIGNATURE") => {
                let signing_urls = self
                    .get_json(&format!("agreements/{}/signingUrls", agreement_id))
                    .await?;
                if let Some(map) = agreement.as_object_mut() {
                    map.insert("signingUrls".to_string(), signing_urls);
                }
            }
            Some("SIGNED") | Some("COMPLETED") => {
                let signed = self
                    .get_json(&format!("agreements/{}/combinedDocument/url", agreement_id))
                    .await?;
                if let Some(map) = agreement.as_object_mut() {
                    map.insert(
                        "signedDocumentUrl".to_string(),
                        signed["url"].clone(),
                    );
                }
            }
            _ => {}
        }

        Ok(agreement)
    }
}

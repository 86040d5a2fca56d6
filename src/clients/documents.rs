//! Document provider client (Google Drive/Docs style REST API).
//!
//! Pipeline: download the source .docx, upload it to the configured folder,
//! convert to an editable document, apply base formatting and sharing
//! permissions, and later export to PDF with the placeholder anchor stripped.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{check_status, read_json, DocumentProvider, GeneratedDocument};
use crate::config::Config;
use crate::errors::AppError;

const SERVICE: &str = "documents";

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3";
const DOCS_API: &str = "https://docs.googleapis.com/v1";

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

pub struct GoogleDriveClient {
    http: reqwest::Client,
    access_token: String,
    folder_id: String,
    share_domain: Option<String>,
    anchor_text: String,
    timeout: Duration,
}

impl GoogleDriveClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: config.documents_access_token.clone(),
            folder_id: config.documents_folder_id.clone(),
            share_domain: config.documents_share_domain.clone(),
            anchor_text: config.document_anchor_text.clone(),
            timeout: config.upstream_timeout,
        }
    }

    async fn download_source(&self, source_url: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .http
            .get(source_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| AppError::upstream(SERVICE, e))
    }

    /// Upload the raw .docx bytes, returning the uploaded file's id.
    async fn upload_docx(&self, bytes: Vec<u8>) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/files?uploadType=media", DRIVE_UPLOAD_API))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, DOCX_MIME)
            .timeout(self.timeout)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        let body = read_json(SERVICE, response).await?;
        body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Upstream {
                service: SERVICE,
                kind: crate::errors::UpstreamKind::Transport,
                message: "Upload returned no file id".into(),
            })
    }

    /// Copy-convert the uploaded file into an editable document filed under
    /// the configured folder.
    async fn convert_to_document(&self, file_id: &str, name: &str) -> Result<String, AppError> {
        let payload = json!({
            "name": name,
            "mimeType": GOOGLE_DOC_MIME,
            "parents": [self.folder_id],
        });
        let response = self
            .http
            .post(format!("{}/files/{}/copy?fields=id", DRIVE_API, file_id))
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        let body = read_json(SERVICE, response).await?;
        body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Upstream {
                service: SERVICE,
                kind: crate::errors::UpstreamKind::Transport,
                message: "Conversion returned no document id".into(),
            })
    }

    async fn docs_batch_update(&self, doc_id: &str, requests: Value) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/documents/{}:batchUpdate", DOCS_API, doc_id))
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        check_status(SERVICE, response).await?;
        Ok(())
    }

    async fn get_document(&self, doc_id: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .get(format!("{}/documents/{}", DOCS_API, doc_id))
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    /// Normalize margins, line spacing, and the base font across the document.
    async fn apply_base_formatting(&self, doc_id: &str) -> Result<(), AppError> {
        let document = self.get_document(doc_id).await?;
        let Some(last_index) = document["body"]["content"]
            .as_array()
            .and_then(|content| content.last())
            .and_then(|element| element["endIndex"].as_i64())
        else {
            return Ok(());
        };
        if last_index <= 1 {
            return Ok(());
        }

        let requests = json!([
            {
                "updateDocumentStyle": {
                    "documentStyle": {
                        "marginTop": { "magnitude": 72, "unit": "PT" },
                        "marginBottom": { "magnitude": 72, "unit": "PT" },
                        "marginLeft": { "magnitude": 72, "unit": "PT" },
                        "marginRight": { "magnitude": 72, "unit": "PT" },
                    },
                    "fields": "marginTop,marginBottom,marginLeft,marginRight",
                }
            },
            {
                "updateParagraphStyle": {
                    "range": { "startIndex": 1, "endIndex": last_index },
                    "paragraphStyle": {
                        "lineSpacing": 100,
                        "spaceAbove": { "magnitude": 0, "unit": "PT" },
                        "spaceBelow": { "magnitude": 0, "unit": "PT" },
                    },
                    "fields": "lineSpacing,spaceAbove,spaceBelow",
                }
            },
            {
                "updateTextStyle": {
                    "range": { "startIndex": 1, "endIndex": last_index },
                    "textStyle": {
                        "fontSize": { "magnitude": 10, "unit": "PT" },
                        "weightedFontFamily": { "fontFamily": "Arial", "weight": 400 },
                    },
                    "fields": "fontSize,weightedFontFamily",
                }
            },
        ]);

        self.docs_batch_update(doc_id, requests).await
    }

    /// Share the document: optional domain-wide writer access plus
    /// anyone-with-link commenter access.
    async fn set_permissions(&self, doc_id: &str) -> Result<(), AppError> {
        let mut grants = Vec::new();
        if let Some(domain) = &self.share_domain {
            grants.push(json!({ "role": "writer", "type": "domain", "domain": domain }));
        }
        grants.push(json!({ "role": "commenter", "type": "anyone" }));

        for grant in grants {
            let response = self
                .http
                .post(format!("{}/files/{}/permissions", DRIVE_API, doc_id))
                .bearer_auth(&self.access_token)
                .timeout(self.timeout)
                .json(&grant)
                .send()
                .await
                .map_err(|e| AppError::upstream(SERVICE, e))?;
            check_status(SERVICE, response).await?;
        }
        Ok(())
    }

    /// Remove the placeholder anchor sentence from the top of the document.
    /// Absent anchors are fine; the document may already be clean.
    async fn strip_anchor(&self, doc_id: &str) -> Result<(), AppError> {
        let document = self.get_document(doc_id).await?;
        let Some(content) = document["body"]["content"].as_array() else {
            return Ok(());
        };

        let mut range = None;
        // The anchor lives in the first few paragraphs.
        for element in content.iter().take(5) {
            let Some(elements) = element["paragraph"]["elements"].as_array() else {
                continue;
            };
            for el in elements {
                let Some(text) = el["textRun"]["content"].as_str() else {
                    continue;
                };
                if text.contains(&self.anchor_text) {
                    if let Some(start) = el["startIndex"].as_i64() {
                        range = Some((start, start + self.anchor_text.len() as i64));
                    }
                }
            }
        }

        let Some((start_index, end_index)) = range else {
            tracing::debug!("Anchor text not found in document {}", doc_id);
            return Ok(());
        };

        let requests = json!([
            {
                "deleteContentRange": {
                    "range": { "startIndex": start_index, "endIndex": end_index }
                }
            }
        ]);
        self.docs_batch_update(doc_id, requests).await
    }
}

#[async_trait]
impl DocumentProvider for GoogleDriveClient {
    async fn create_document(
        &self,
        source_url: &str,
        participant_name: &str,
    ) -> Result<GeneratedDocument, AppError> {
        let to_generation_error = |e: AppError| match e {
            AppError::Upstream { message, .. } => AppError::DocumentGeneration(message),
            other => other,
        };

        let bytes = self.download_source(source_url).await.map_err(to_generation_error)?;
        let uploaded_id = self.upload_docx(bytes).await.map_err(to_generation_error)?;

        let name = format!("Contract - {}", participant_name);
        let doc_id = self
            .convert_to_document(&uploaded_id, &name)
            .await
            .map_err(to_generation_error)?;

        // Formatting and sharing failures are secondary; the document exists.
        if let Err(e) = self.apply_base_formatting(&doc_id).await {
            tracing::warn!("Failed to format document {}: {}", doc_id, e);
        }
        self.set_permissions(&doc_id).await.map_err(to_generation_error)?;

        Ok(GeneratedDocument {
            doc_url: format!("https://docs.google.com/document/d/{}/edit", doc_id),
            doc_id,
        })
    }

    async fn export_pdf(&self, doc_id: &str) -> Result<PathBuf, AppError> {
        self.strip_anchor(doc_id).await?;

        let response = self
            .http
            .get(format!(
                "{}/files/{}/export?mimeType=application/pdf",
                DRIVE_API, doc_id
            ))
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;

        let path = std::env::temp_dir().join(format!("contract-{}.pdf", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            AppError::Storage(format!("Cannot write artifact {}: {}", path.display(), e))
        })?;

        tracing::debug!("Exported document {} to {}", doc_id, path.display());
        Ok(path)
    }
}

//! Headless rendering client.
//!
//! Asks the configured rendering service to load a page (authenticated by a
//! cookie token) and paginate it as an A4 PDF. Rendering is slow, so the
//! deadline is long, but it is always bounded.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{check_status, PageRenderer};
use crate::config::Config;
use crate::errors::AppError;

const SERVICE: &str = "renderer";

pub struct HttpRenderClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpRenderClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.render_service_url.clone(),
            timeout: config.render_timeout,
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderClient {
    async fn render_page(&self, url: &str, token: &str) -> Result<PathBuf, AppError> {
        let payload = json!({
            "url": url,
            "cookies": [{ "name": "token", "value": token }],
            "format": "a4",
            "printBackground": true,
            "omitBackground": true,
            "margin": { "bottom": 50 },
        });

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;

        let path = std::env::temp_dir().join(format!("export-{}.pdf", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            AppError::Storage(format!("Cannot write render output {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}

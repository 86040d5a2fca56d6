//! Signature-provider callbacks and the fire-and-forget render job.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::ApiResult;
use crate::AppState;

/// Header the signature provider uses to identify its application; the
/// endpoint must echo it back for the callback to be accepted.
const CLIENT_ID_HEADER: &str = "x-adobesign-clientid";

fn echo_client_id(headers: &HeaderMap) -> Response {
    let mut response = StatusCode::OK.into_response();
    if let Some(client_id) = headers.get(CLIENT_ID_HEADER) {
        response
            .headers_mut()
            .insert("X-AdobeSign-ClientId", client_id.clone());
    }
    response
}

/// GET /adobe-webhook - Verification challenge from the signature provider.
pub async fn adobe_webhook_challenge(headers: HeaderMap) -> Response {
    echo_client_id(&headers)
}

/// POST /adobe-webhook - Agreement event notification.
pub async fn adobe_webhook_event(headers: HeaderMap, Json(event): Json<Value>) -> Response {
    tracing::info!(
        "Agreement webhook event: {}",
        event["event"].as_str().unwrap_or("unknown")
    );
    echo_client_id(&headers)
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub url: String,
    pub token: String,
}

/// POST /export-to-pdf - Kick off a page render without holding the request
/// open; rendering can take minutes.
pub async fn export_to_pdf(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> ApiResult<StatusCode> {
    let renderer = state.renderer.clone();
    tokio::spawn(async move {
        match renderer.render_page(&request.url, &request.token).await {
            Ok(path) => tracing::info!("Rendered {} to {}", request.url, path.display()),
            Err(e) => tracing::error!("Render of {} failed: {}", request.url, e),
        }
    });
    Ok(StatusCode::ACCEPTED)
}

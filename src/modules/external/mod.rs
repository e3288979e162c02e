use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bookshelf_http::error::AppError;
use bookshelf_kernel::Module;
use serde_json::json;

use crate::state::AppState;
use crate::utils::error_response;

/// Relays one fixed third-party document
pub struct ExternalModule {
    state: AppState,
}

impl ExternalModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for ExternalModule {
    fn name(&self) -> &'static str {
        "external"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/getSfDoc", get(get_sf_doc))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/getSfDoc": {
                    "get": {
                        "summary": "Relay the Symfony docs repository document from GitHub",
                        "tags": ["External"],
                        "responses": {
                            "200": {
                                "description": "Upstream body, unchanged",
                                "content": {
                                    "application/json": { "schema": { "type": "object" } }
                                }
                            },
                            "500": error_response("Upstream unreachable or returned an error")
                        }
                    }
                }
            }
        }))
    }
}

/// Body and status are relayed as received; only 2xx answers get through.
async fn get_sf_doc(State(state): State<AppState>) -> Result<Response, AppError> {
    let url = &state.settings.external.sf_doc_url;

    let response = state
        .http
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%url, status = status.as_u16(), "upstream returned an error status");
        return Err(anyhow::anyhow!("GET {url} answered {status}").into());
    }

    let body = response
        .bytes()
        .await
        .with_context(|| format!("reading body of {url}"))?;
    tracing::debug!(%url, bytes = body.len(), "relaying upstream document");

    let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK);
    Ok((
        status,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}

/// Create a new instance of the external module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(ExternalModule::new(state))
}

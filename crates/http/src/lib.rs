//! HTTP server facade for bookshelf with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{extract::Request, http::HeaderValue, routing::get, Router};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::{Timestamp, Uuid};

use bookshelf_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod extract;
pub mod router;
pub mod versioning;

use router::RouterBuilder;
use versioning::{ApiVersion, DefaultApiVersion};

/// Serve `app` on the configured address until the process is stopped
pub async fn start_server(app: Router, settings: &Settings) -> anyhow::Result<()> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Router with the health check, every module mounted, and OpenAPI docs.
///
/// The versioning default is installed here; callers add their own
/// extensions, then finish with [`RouterBuilder::with_default_layers`].
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> RouterBuilder {
    let default_version = settings
        .api
        .default_version
        .parse()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to API version {}", ApiVersion::default());
            ApiVersion::default()
        });

    RouterBuilder::new()
        .route("/healthz", get(health_check))
        .mount_modules(registry)
        .with_openapi(registry)
        .with_extension(DefaultApiVersion(default_version))
}

impl RouterBuilder {
    /// Global middleware stack shared by the server binary and the tests
    pub fn with_default_layers(self, settings: &Settings) -> Self {
        self.with_timeout(settings.server.request_timeout_ms)
            .with_tracing()
            .with_cors()
            .with_request_id()
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Request ID generator for tracing
#[derive(Clone)]
pub(crate) struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

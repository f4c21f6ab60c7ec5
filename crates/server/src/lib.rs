//! HTTP server for the grounded knowledge base, using Axum.
//!
//! All routes live under `/api`. Application outcomes are reported in the
//! JSON body with an `error` flag; only a concurrent build is signalled with
//! an HTTP status (409).

pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use grounded_core::AppConfig;
use grounded_knowledge::{DocumentPool, Ingestor, KnowledgeEngine, KnowledgeSettings};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for request handlers.
#[derive(Debug)]
pub struct AppState {
    pub engine: Arc<KnowledgeEngine>,
    pub ingestor: Arc<Ingestor>,
    pub pool: DocumentPool,
}

impl AppState {
    pub fn new(engine: Arc<KnowledgeEngine>, ingestor: Arc<Ingestor>, pool: DocumentPool) -> Self {
        Self {
            engine,
            ingestor,
            pool,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(routes::status))
        .route("/api/build", post(routes::build))
        .route("/api/query", post(routes::query))
        .route("/api/upload", post(routes::upload))
        .route("/api/file-counts", get(routes::file_counts))
        .route("/api/clear-files", post(routes::clear_files))
        .route("/api/health", get(routes::health))
        .layer(DefaultBodyLimit::max(routes::MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Load the embedding model, prepare the pool and serve until shutdown.
///
/// The knowledge base starts not ready; clients call `POST /api/build`.
pub async fn start(config: &AppConfig) -> anyhow::Result<()> {
    let settings = KnowledgeSettings::from_app_config(config);

    let pool = settings.pool();
    pool.ensure_layout()?;
    let counts = pool.file_counts();
    tracing::info!(
        pool = ?pool.root(),
        pdfs = counts.pdfs,
        images = counts.images,
        audios = counts.audios,
        "Document pool ready"
    );

    let engine = Arc::new(KnowledgeEngine::from_settings(&settings).await?);
    let state = AppState::new(engine, Arc::new(Ingestor::new()), pool);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

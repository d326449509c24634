pub mod api;
pub mod app_state;
pub mod config;
pub mod extractor;

use anyhow::Context;
use axum::Router;
use axum::extract::Extension;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

//
// Re-export
//
pub use api::{CorsPolicy, DownloadRequest, ErrorResponse, cors_headers, log_request_errors};
pub use app_state::AppState;
pub use config::Config;
pub use extractor::{
    ExtractionError, Extractor, MetadataSource, SourceError, VideoMetadata, YtDlp, YtDlpOptions,
};

/// Build the HTTP router around a prepared state.
pub fn app(state: AppState, cors: CorsPolicy) -> Router {
    Router::new()
        .route("/", get(api::routes::root))
        .route("/health", get(api::routes::health))
        .route(
            "/download/twitter",
            post(api::routes::download_twitter).options(api::routes::download_options),
        )
        .fallback(api::routes::not_found)
        .method_not_allowed_fallback(api::routes::method_not_allowed)
        .layer(axum::middleware::from_fn(api::log_request_errors))
        .layer(axum::middleware::from_fn_with_state(cors, api::cors_headers))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cors = if config.allows_any_origin() {
        CorsPolicy::any()
    } else {
        info!(origins = ?config.allowed_origins, "Restricting CORS origins");
        CorsPolicy::allow_list(&config.allowed_origins)?
    };

    let state = AppState::from_config(&config).await;
    let app = app(state, cors);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

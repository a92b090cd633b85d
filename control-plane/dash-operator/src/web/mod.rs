use axum::{Router, routing::get};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn health_router() -> Router {
    // /health is preferred, /healthz kept for probes that expect it
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(addr: SocketAddr) -> anyhow::Result<()> {
    info!("health endpoint listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, health_router()).await?;
    Ok(())
}

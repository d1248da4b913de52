use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;

/// Minimal liveness responder for external uptime monitors.
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let app = Router::new().route("/", get(|| async { "✅ feed-relay is running." }));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "health endpoint listening");
    axum::serve(listener, app).await?;
    Ok(())
}

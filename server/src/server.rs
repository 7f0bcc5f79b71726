use crate::driver::Driver;
use axum::{extract::State, routing::get, Json, Router};
use shared::{Frame, SimStats};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub driver: Driver,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/frame", get(handle_frame))
        .route("/api/stats", get(handle_stats))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the read-only API until Ctrl-C, then stop the tick schedule
pub async fn run(driver: Driver, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(AppState {
        driver: driver.clone(),
    });

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    driver.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Frame of the last completed tick
async fn handle_frame(State(state): State<AppState>) -> Json<Frame> {
    Json(state.driver.frame().await)
}

async fn handle_stats(State(state): State<AppState>) -> Json<SimStats> {
    Json(state.driver.stats().await)
}

async fn health() -> &'static str {
    "ok"
}

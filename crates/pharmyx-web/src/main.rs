//! Pharmyx Web Server
//!
//! Run with: cargo run -p pharmyx-web

use tracing::info;

use pharmyx_web::config::Config;
use pharmyx_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    let log_switch = pharmyx_web::logging::init(&config.logging.default_filter)?;

    info!("Starting Pharmyx Web Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        base_url = %config.entrez.base_url,
        interval_ms = config.entrez.request_interval_ms,
        "E-utilities client configured"
    );

    let state = AppState::from_config(&config, log_switch)?;
    let app = pharmyx_web::router::build_router(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

use anyhow::Context;
use tokio::net::TcpListener;

use chillstay_backend::core::config::AppConfig;
use chillstay_backend::core::logging;
use chillstay_backend::server::router::router;
use chillstay_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load();
    logging::init(&config.log_dir);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::initialize(config).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    let app = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use washbay::config::AppConfig;
use washbay::db;
use washbay::routes;
use washbay::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is not set; provisioning uses the default token");
    }

    let conn = db::init_db(&config.database_url)?;
    tracing::info!(database = %config.database_url, "database ready");

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(conn, config));
    let app = routes::router(state);

    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

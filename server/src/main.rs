mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use config::{ConfigError, ServerConfig};
use services::postgres::PgCollaborators;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    tracing::info!(?config, "config loaded");

    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    let collab = Arc::new(PgCollaborators::new(pool));

    let state = state::AppState::new(collab.clone(), collab.clone(), collab)
        .with_client_channel_capacity(config.client_channel_capacity);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;

    tracing::info!(port = config.port, "board sync hub listening");
    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use anyhow::Result;
use common::store::MemoryStore;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use api::config::AppConfig;
use api::email::LogMailer;
use api::jwt::{JwtConfig, JwtService};
use api::payment::DevGateway;
use api::routes;
use api::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting souq API service");

    let config = AppConfig::from_env()?;
    let jwt = JwtService::new(JwtConfig::from_env()?);

    let store = Arc::new(MemoryStore::new().with_unique("users", "email"));
    let mailer = Arc::new(LogMailer);
    let gateway = Arc::new(DevGateway::new(config.webhook_secret.clone()));

    let state = AppState::new(store, jwt, mailer, gateway, config.clone());
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("API service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

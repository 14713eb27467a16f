use std::{net::SocketAddr, sync::Arc};

mod activity;
mod admin;
mod app;
mod auth;
mod cache;
mod config;
mod db;
mod error;
mod extract;
mod logging;
#[cfg(test)]
mod memory;
mod state;
mod users;

use crate::{
    config::{AppConfig, LoggingConfig},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guard = logging::init(&LoggingConfig::from_env())?;

    let config = Arc::new(AppConfig::from_env()?);

    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let app_state = AppState::from_pool(pool, Arc::clone(&config));
    db::seed_admin(app_state.users.as_ref(), &config.admin).await?;

    let app = app::build_app(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

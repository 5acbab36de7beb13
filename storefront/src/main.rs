//! storefront — order orchestration service
//!
//! Long-running service that:
//! - Turns customer carts into orders, reserving stock atomically
//! - Opens payment gateway orders for online payments
//! - Reconciles gateway webhooks and client confirmations into paid orders
//! - Applies administrative status changes, restoring stock on cancellation

mod api;
mod auth;
mod cart;
mod config;
mod db;
mod error;
mod gateway;
mod inventory;
mod orders;
mod state;

#[cfg(test)]
mod testing;

use config::Config;
use db::BoxError;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env().inspect_err(|e| {
        tracing::error!("Invalid configuration: {e}");
    })?;

    tracing::info!(
        env = %config.environment,
        currency = %config.gateway.currency,
        "Starting storefront"
    );

    // Initialize application state
    let state = AppState::new(&config).await?;

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("storefront HTTP listening on {http_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

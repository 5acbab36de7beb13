//! Application state for storefront

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::db::postgres::PgStore;
use crate::db::{BoxError, Store};
use crate::gateway::{GatewayConfig, PaymentGateway, RazorpayGateway};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orders, carts, stock
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub gateway_config: Arc<GatewayConfig>,
    /// JWT secret for customer/admin authentication
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and build the gateway client
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let gateway = RazorpayGateway::new(&config.gateway)?;

        Ok(Self::from_parts(
            Arc::new(PgStore::new(pool)),
            Arc::new(gateway),
            config.gateway.clone(),
            &config.jwt_secret,
        ))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        gateway_config: GatewayConfig,
        jwt_secret: &str,
    ) -> Self {
        Self {
            store,
            gateway,
            gateway_config: Arc::new(gateway_config),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

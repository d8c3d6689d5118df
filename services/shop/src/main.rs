use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod config;
mod error;
mod mailer;
mod middleware;
mod models;
mod password;
mod repositories;
mod routes;
mod scheduler;
mod token;
mod validation;

use sqlx::PgPool;

use crate::{
    config::AppConfig,
    mailer::{Mailer, MailerConfig},
    repositories::{InventoryRepository, OrderRepository, TokenRepository, UserRepository},
    scheduler::OrderScheduler,
    token::{TokenConfig, TokenService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: PgPool,
    pub token_service: TokenService,
    pub mailer: Mailer,
    pub scheduler: OrderScheduler,
    pub user_repository: UserRepository,
    pub token_repository: TokenRepository,
    pub order_repository: OrderRepository,
    pub inventory_repository: InventoryRepository,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting shop service");

    let app_config = AppConfig::from_env()?;

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| common::error::DatabaseError::Migration(e.to_string()))?;
    info!("Database migrations applied");

    // Initialize the token service
    let token_config = TokenConfig::from_env()?;
    let token_service = TokenService::new(token_config);

    // Initialize the mail transport
    let mailer_config = MailerConfig::from_env()?;
    let mailer = Mailer::new(&mailer_config)?;

    let app_state = AppState {
        config: app_config.clone(),
        db_pool: pool.clone(),
        token_service,
        mailer,
        scheduler: OrderScheduler::new(),
        user_repository: UserRepository::new(pool.clone()),
        token_repository: TokenRepository::new(pool.clone()),
        order_repository: OrderRepository::new(pool.clone()),
        inventory_repository: InventoryRepository::new(pool),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&app_config.bind_addr).await?;
    info!("Shop service listening on {}", app_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

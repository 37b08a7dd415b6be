use barkasse::errors::Result;
use barkasse::web::{AppState, auth::SessionKeys, serve};
use barkasse::{config, core::booking::PurchasePolicy};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    info!("Configuration loaded.");

    // 4. Initialize the database
    let db = config::database::create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    config::database::create_tables(&db).await?;
    info!("Database initialized.");

    // 5. Seed articles and the initial admin user
    config::database::seed_articles(&db, &app_config.articles, app_config.policy.default_minimum_stock)
        .await
        .inspect_err(|e| error!("Failed to seed articles: {e}"))?;
    config::database::ensure_admin_user(&db)
        .await
        .inspect_err(|e| error!("Failed to create admin user: {e}"))?;

    // 6. Open the read-only connection for the admin SQL console
    let readonly_db = config::database::create_readonly_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to open read-only connection: {e}"))?;

    // 7. Run the HTTP server
    let policy: PurchasePolicy = app_config.policy.clone();
    let state = AppState {
        db,
        readonly_db,
        policy: Arc::new(policy),
        sessions: Arc::new(SessionKeys::from_env()),
    };
    serve(state, &app_config.server.bind).await
}

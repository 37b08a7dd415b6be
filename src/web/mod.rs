//! Web layer - axum HTTP surface and shared application state.
//!
//! Routes split into the unauthenticated bar-side API, the login endpoints
//! and the admin area behind the session middleware. The handlers translate
//! wire shapes; all business rules live in [`crate::core`].

/// Admin endpoints: history, CRUD, exports, reports, SQL console
pub mod admin;
/// Login/logout and the admin session middleware
pub mod auth;
/// Bar-side endpoints: search, articles, purchase
pub mod bar;
/// Error-to-response mapping
pub mod error;
/// CSV assembly for the export endpoints
pub mod export;

use crate::core::booking::PurchasePolicy;
use crate::errors::Result;
use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read-write connection used by everything except the SQL console
    pub db: DatabaseConnection,
    /// Read-only connection reserved for the SQL console
    pub readonly_db: DatabaseConnection,
    /// Purchase policy consulted by the booking core
    pub policy: Arc<PurchasePolicy>,
    /// Session token keys
    pub sessions: Arc<auth::SessionKeys>,
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/buchungen", get(admin::booking_history))
        .route("/buchungen/export", get(admin::export_bookings))
        .route("/buchungen/{id}/toggle", post(admin::toggle_booking))
        .route(
            "/mitglieder",
            get(admin::list_members).post(admin::create_member),
        )
        .route("/mitglieder/import", post(admin::import_balances))
        .route("/mitglieder/export", get(admin::export_members))
        .route(
            "/mitglieder/{id}",
            put(admin::update_member).delete(admin::delete_member),
        )
        .route("/mitglieder/{id}/aufladen", post(admin::recharge_member))
        .route("/mitglieder/{id}/sperre", post(admin::set_blacklist))
        .route(
            "/artikel",
            get(admin::list_articles).post(admin::create_article),
        )
        .route("/artikel/export", get(admin::export_articles))
        .route("/artikel/warnungen", get(admin::low_stock))
        .route(
            "/artikel/{id}",
            put(admin::update_article).delete(admin::delete_article),
        )
        .route("/artikel/{id}/bestand", post(admin::adjust_stock))
        .route("/berichte/umsatz", get(admin::revenue_report))
        .route("/berichte/artikel", get(admin::article_report))
        .route("/berichte/guthaben", get(admin::balance_report))
        .route(
            "/berichte",
            get(admin::list_reports).post(admin::save_report),
        )
        .route("/berichte/{id}", delete(admin::delete_report))
        .route("/berichte/{id}/run", post(admin::run_report))
        .route("/sql", post(admin::sql_console))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/mitglieder", get(bar::members))
        .route("/api/artikel", get(bar::articles))
        .route("/api/buchen", post(bar::purchase))
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the listener and serves the router until shutdown.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

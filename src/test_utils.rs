//! Shared test utilities.
//!
//! Common helpers for setting up in-memory test databases and creating test
//! entities with sensible defaults.

use crate::{
    core::{article, booking::PurchasePolicy, member},
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory SQLite database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The default test policy: floor at -50.00, pre-debit check, stock
/// enforcement on.
#[must_use]
pub fn test_policy() -> PurchasePolicy {
    PurchasePolicy::default()
}

/// Creates a test member with zero balance and no nickname/email.
pub async fn create_test_member(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::member::Model> {
    member::create_member(db, name.to_string(), None, None).await
}

/// Creates a test member and sets its starting balance directly.
///
/// The balance write bypasses the booking ledger on purpose: it models the
/// "initial balance" the conservation invariant is measured against.
pub async fn create_member_with_balance(
    db: &DatabaseConnection,
    name: &str,
    guthaben: f64,
) -> Result<entities::member::Model> {
    let created = create_test_member(db, name).await?;
    member::update_member_balance_atomic(db, created.id, guthaben).await
}

/// Creates a test article with the default minimum-stock threshold of 5.
pub async fn create_test_article(
    db: &DatabaseConnection,
    name: &str,
    preis: f64,
    bestand: i32,
) -> Result<entities::article::Model> {
    article::create_article(db, name.to_string(), preis, bestand, None, None, 5).await
}

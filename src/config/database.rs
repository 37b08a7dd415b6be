//! Database connection and table creation using SeaORM.
//!
//! Tables are generated from the entity definitions via
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL. The admin SQL console gets its own
//! read-only connection (`mode=ro`) so it can never share a mutating
//! transaction with the booking core.

use crate::config::settings::ArticleSeed;
use crate::entities::{Article, Booking, Member, Report, User, article, user};
use crate::errors::{Error, Result};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, PaginatorTrait, Schema, Set, prelude::*,
};

/// Establishes the main (read-write) database connection.
///
/// `DATABASE_URL` in the environment overrides the configured URL.
pub async fn create_connection(url: &str) -> Result<DatabaseConnection> {
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| url.to_string());
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Rewrites a SQLite URL into its read-only form (`mode=ro`).
///
/// In-memory URLs are returned unchanged; a second connection to a fresh
/// in-memory database would be useless anyway.
#[must_use]
pub fn readonly_url(url: &str) -> String {
    if url.contains(":memory:") {
        return url.to_string();
    }
    let base = url.split('?').next().unwrap_or(url);
    format!("{base}?mode=ro")
}

/// Establishes the read-only connection used by the admin SQL console.
pub async fn create_readonly_connection(url: &str) -> Result<DatabaseConnection> {
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| url.to_string());
    Database::connect(readonly_url(&database_url))
        .await
        .map_err(Into::into)
}

/// Creates all tables from the entity definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let member_table = schema.create_table_from_entity(Member);
    let article_table = schema.create_table_from_entity(Article);
    let booking_table = schema.create_table_from_entity(Booking);
    let user_table = schema.create_table_from_entity(User);
    let report_table = schema.create_table_from_entity(Report);

    db.execute(builder.build(&member_table)).await?;
    db.execute(builder.build(&article_table)).await?;
    db.execute(builder.build(&booking_table)).await?;
    db.execute(builder.build(&user_table)).await?;
    db.execute(builder.build(&report_table)).await?;

    Ok(())
}

/// Seeds the configured articles, but only while the article table is empty.
pub async fn seed_articles(
    db: &DatabaseConnection,
    seeds: &[ArticleSeed],
    default_minimum_stock: i32,
) -> Result<()> {
    if seeds.is_empty() || Article::find().count(db).await? > 0 {
        return Ok(());
    }

    for seed in seeds {
        let model = article::ActiveModel {
            name: Set(seed.name.trim().to_string()),
            preis: Set(seed.preis),
            bestand: Set(seed.bestand),
            mindestbestand: Set(seed.mindestbestand.unwrap_or(default_minimum_stock)),
            order: Set(seed.order),
            ..Default::default()
        };
        model.insert(db).await?;
        tracing::info!(article = %seed.name, "seeded article");
    }

    Ok(())
}

/// Creates the initial admin user when the user table is empty.
///
/// Credentials come from `ADMIN_USERNAME`/`ADMIN_PASSWORD`; they are required
/// on first start and ignored afterwards.
pub async fn ensure_admin_user(db: &DatabaseConnection) -> Result<()> {
    if User::find().count(db).await? > 0 {
        return Ok(());
    }

    let username = std::env::var("ADMIN_USERNAME").map_err(|_| Error::Config {
        message: "ADMIN_USERNAME must be set for the first start".to_string(),
    })?;
    let password = std::env::var("ADMIN_PASSWORD").map_err(|_| Error::Config {
        message: "ADMIN_PASSWORD must be set for the first start".to_string(),
    })?;

    let password_hash = user::Model::hash_password(&password).map_err(|e| Error::Config {
        message: format!("Failed to hash admin password: {e}"),
    })?;

    let admin = user::ActiveModel {
        username: Set(username.clone()),
        password_hash: Set(password_hash),
        is_admin: Set(true),
        ..Default::default()
    };
    admin.insert(db).await?;
    tracing::info!(%username, "created initial admin user");

    Ok(())
}

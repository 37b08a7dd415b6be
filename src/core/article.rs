//! Article business logic - Handles all article-related operations.
//!
//! Provides CRUD for articles, the administrative stock adjustment, the
//! low-stock warning list, and the atomic stock update used by the booking
//! core. Stock changes use a single SQL `UPDATE ... SET bestand = bestand +
//! ?` statement, mirroring the balance update on the member side.

use crate::{
    entities::{Article, Booking, article, booking},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};

/// Retrieves all articles, display order first, then name.
pub async fn get_all_articles(db: &DatabaseConnection) -> Result<Vec<article::Model>> {
    Article::find()
        .order_by_asc(article::Column::Order)
        .order_by_asc(article::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an article by its unique ID.
pub async fn get_article_by_id(
    db: &DatabaseConnection,
    artikel_id: i64,
) -> Result<Option<article::Model>> {
    Article::find_by_id(artikel_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new article, performing input validation.
///
/// # Errors
/// Returns an error if the trimmed name is empty, the price is negative or
/// not finite, or stock/threshold are negative.
pub async fn create_article(
    db: &DatabaseConnection,
    name: String,
    preis: f64,
    bestand: i32,
    mindestbestand: Option<i32>,
    order: Option<i32>,
    default_minimum_stock: i32,
) -> Result<article::Model> {
    validate_fields(&name, preis, bestand, mindestbestand)?;

    let model = article::ActiveModel {
        name: Set(name.trim().to_string()),
        preis: Set(preis),
        bestand: Set(bestand),
        mindestbestand: Set(mindestbestand.unwrap_or(default_minimum_stock)),
        order: Set(order),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Updates an article's name, price, stock, threshold and display order.
pub async fn update_article(
    db: &DatabaseConnection,
    artikel_id: i64,
    name: String,
    preis: f64,
    bestand: i32,
    mindestbestand: i32,
    order: Option<i32>,
) -> Result<article::Model> {
    validate_fields(&name, preis, bestand, Some(mindestbestand))?;

    let mut model: article::ActiveModel = Article::find_by_id(artikel_id)
        .one(db)
        .await?
        .ok_or(Error::ArticleNotFound { id: artikel_id })?
        .into();

    model.name = Set(name.trim().to_string());
    model.preis = Set(preis);
    model.bestand = Set(bestand);
    model.mindestbestand = Set(mindestbestand);
    model.order = Set(order);

    model.update(db).await.map_err(Into::into)
}

/// Deletes an article together with all bookings that reference it.
///
/// Runs as one transaction; the remaining ledger never points at a missing
/// article.
pub async fn delete_article(db: &DatabaseConnection, artikel_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    Article::find_by_id(artikel_id)
        .one(&txn)
        .await?
        .ok_or(Error::ArticleNotFound { id: artikel_id })?;

    Booking::delete_many()
        .filter(booking::Column::ArtikelId.eq(artikel_id))
        .exec(&txn)
        .await?;
    Article::delete_by_id(artikel_id).exec(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Administrative stock adjustment by a signed delta.
pub async fn adjust_stock(
    db: &DatabaseConnection,
    artikel_id: i64,
    delta: i32,
) -> Result<article::Model> {
    update_article_stock_atomic(db, artikel_id, delta).await
}

/// Articles whose stock has fallen below their minimum-stock threshold.
pub async fn low_stock(db: &DatabaseConnection) -> Result<Vec<article::Model>> {
    Article::find()
        .filter(Expr::col(article::Column::Bestand).lt(Expr::col(article::Column::Mindestbestand)))
        .order_by_asc(article::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Atomically adds a delta to an article's stock count.
///
/// Single SQL statement, callable inside a transaction; returns the updated
/// article.
pub(crate) async fn update_article_stock_atomic<C>(
    db: &C,
    artikel_id: i64,
    delta: i32,
) -> Result<article::Model>
where
    C: ConnectionTrait,
{
    let _article = Article::find_by_id(artikel_id)
        .one(db)
        .await?
        .ok_or(Error::ArticleNotFound { id: artikel_id })?;

    Article::update_many()
        .col_expr(
            article::Column::Bestand,
            Expr::col(article::Column::Bestand).add(delta),
        )
        .filter(article::Column::Id.eq(artikel_id))
        .exec(db)
        .await?;

    Article::find_by_id(artikel_id)
        .one(db)
        .await?
        .ok_or(Error::ArticleNotFound { id: artikel_id })
}

fn validate_fields(
    name: &str,
    preis: f64,
    bestand: i32,
    mindestbestand: Option<i32>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Artikelname darf nicht leer sein."));
    }
    if preis < 0.0 || !preis.is_finite() {
        return Err(Error::InvalidAmount { amount: preis });
    }
    if bestand < 0 {
        return Err(Error::validation("Bestand darf nicht negativ sein."));
    }
    if mindestbestand.is_some_and(|m| m < 0) {
        return Err(Error::validation("Mindestbestand darf nicht negativ sein."));
    }
    Ok(())
}

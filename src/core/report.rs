//! Reporting business logic - read-only aggregation over the ledger.
//!
//! Revenue totals, per-article sales and the member balance sheet are
//! computed over active (non-cancelled) bookings. The ad-hoc SQL console
//! runs on a dedicated read-only connection and additionally refuses
//! anything that is not a single `SELECT`/`WITH` statement, so it can never
//! piggyback on a mutating transaction.

use crate::{
    entities::{Booking, Report, article, booking, report},
    errors::{Error, Result},
};
use sea_orm::{FromQueryResult, JsonValue, QueryOrder, Set, Statement, prelude::*};
use serde::Serialize;
use std::collections::HashMap;

/// Revenue summary for a time range.
#[derive(Debug, Clone, Serialize)]
pub struct RevenueSummary {
    /// Gross revenue of active purchases
    pub umsatz: f64,
    /// Number of active purchases
    pub buchungen: u64,
    /// Number of cancelled purchases in the range
    pub storniert: u64,
    /// Total value of the cancelled purchases
    pub storniert_summe: f64,
}

/// Sales aggregate for one article.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSales {
    /// Article id
    pub artikel_id: i64,
    /// Article name
    pub name: String,
    /// Quantity sold (active purchases)
    pub menge: i64,
    /// Revenue (active purchases)
    pub umsatz: f64,
}

/// Balance sheet over all members.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheet {
    /// All members, ordered by name
    pub mitglieder: Vec<crate::entities::MemberModel>,
    /// Sum of all balances
    pub gesamt: f64,
}

/// Computes the revenue summary over purchases within a time range.
///
/// Manual adjustments (article-less bookings) are ledger entries, not
/// sales, and are excluded.
pub async fn revenue_summary(
    db: &DatabaseConnection,
    start: DateTimeUtc,
    end: DateTimeUtc,
) -> Result<RevenueSummary> {
    let bookings = purchases_in_range(db, start, end).await?;

    let mut summary = RevenueSummary {
        umsatz: 0.0,
        buchungen: 0,
        storniert: 0,
        storniert_summe: 0.0,
    };
    for b in &bookings {
        if b.is_cancelled() {
            summary.storniert += 1;
            summary.storniert_summe += b.gesamtpreis;
        } else {
            summary.buchungen += 1;
            summary.umsatz += b.gesamtpreis;
        }
    }

    Ok(summary)
}

/// Per-article quantity and revenue within a time range, highest revenue
/// first.
pub async fn article_sales(
    db: &DatabaseConnection,
    start: DateTimeUtc,
    end: DateTimeUtc,
) -> Result<Vec<ArticleSales>> {
    let bookings = purchases_in_range(db, start, end).await?;

    let mut per_article: HashMap<i64, (i64, f64)> = HashMap::new();
    for b in bookings.iter().filter(|b| !b.is_cancelled()) {
        if let Some(artikel_id) = b.artikel_id {
            let entry = per_article.entry(artikel_id).or_insert((0, 0.0));
            entry.0 += i64::from(b.menge);
            entry.1 += b.gesamtpreis;
        }
    }

    let names: HashMap<i64, String> = crate::entities::Article::find()
        .filter(article::Column::Id.is_in(per_article.keys().copied().collect::<Vec<_>>()))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();

    let mut sales: Vec<ArticleSales> = per_article
        .into_iter()
        .map(|(artikel_id, (menge, umsatz))| ArticleSales {
            artikel_id,
            name: names.get(&artikel_id).cloned().unwrap_or_default(),
            menge,
            umsatz,
        })
        .collect();
    sales.sort_by(|a, b| {
        b.umsatz
            .total_cmp(&a.umsatz)
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(sales)
}

/// The balance sheet: every member with the summed total.
pub async fn member_balances(db: &DatabaseConnection) -> Result<BalanceSheet> {
    let mitglieder = crate::core::member::get_all_members(db).await?;
    let gesamt = mitglieder.iter().map(|m| m.guthaben).sum();
    Ok(BalanceSheet { mitglieder, gesamt })
}

/// Rejects everything that is not a single read-only statement.
///
/// First line of defense; the connection the console runs on is opened
/// `mode=ro` as well.
pub fn ensure_readonly(sql: &str) -> Result<()> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(Error::QueryRejected {
            message: "empty statement".to_string(),
        });
    }

    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
    if body.contains(';') {
        return Err(Error::QueryRejected {
            message: "multiple statements are not allowed".to_string(),
        });
    }

    let first_word = body
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if first_word != "select" && first_word != "with" {
        return Err(Error::QueryRejected {
            message: "only SELECT statements are allowed".to_string(),
        });
    }

    Ok(())
}

/// Executes an ad-hoc query on the read-only connection.
///
/// Returns each row as a JSON object keyed by column name.
pub async fn execute_readonly(db: &DatabaseConnection, sql: &str) -> Result<Vec<JsonValue>> {
    ensure_readonly(sql)?;

    let stmt = Statement::from_string(db.get_database_backend(), sql.trim().to_owned());
    JsonValue::find_by_statement(stmt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the saved reports, ordered by name.
pub async fn list_reports(db: &DatabaseConnection) -> Result<Vec<report::Model>> {
    Report::find()
        .order_by_asc(report::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Saves a named query after checking it against the read-only guard.
pub async fn save_report(
    db: &DatabaseConnection,
    name: String,
    sql: String,
) -> Result<report::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Berichtsname darf nicht leer sein."));
    }
    ensure_readonly(&sql)?;

    let model = report::ActiveModel {
        name: Set(name.trim().to_string()),
        sql: Set(sql.trim().to_string()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Deletes a saved report.
pub async fn delete_report(db: &DatabaseConnection, bericht_id: i64) -> Result<()> {
    Report::find_by_id(bericht_id)
        .one(db)
        .await?
        .ok_or(Error::ReportNotFound { id: bericht_id })?;
    Report::delete_by_id(bericht_id).exec(db).await?;
    Ok(())
}

/// Runs a saved report on the read-only connection.
///
/// `db` loads the report definition; `readonly_db` executes it.
pub async fn run_report(
    db: &DatabaseConnection,
    readonly_db: &DatabaseConnection,
    bericht_id: i64,
) -> Result<Vec<JsonValue>> {
    let saved = Report::find_by_id(bericht_id)
        .one(db)
        .await?
        .ok_or(Error::ReportNotFound { id: bericht_id })?;
    execute_readonly(readonly_db, &saved.sql).await
}

async fn purchases_in_range(
    db: &DatabaseConnection,
    start: DateTimeUtc,
    end: DateTimeUtc,
) -> Result<Vec<booking::Model>> {
    Booking::find()
        .filter(booking::Column::Zeitstempel.between(start, end))
        .filter(booking::Column::ArtikelId.is_not_null())
        .all(db)
        .await
        .map_err(Into::into)
}

//! Admin endpoints: booking history, cancellation toggle, member and
//! article management, CSV exports, reports and the SQL console.
//!
//! All routes here sit behind [`crate::web::auth::require_admin`]. Handlers
//! stay thin: parse the request, call the core function, wrap the result
//! into an explicit response struct.

use crate::{
    core::{article as article_core, booking as booking_core, member as member_core, report},
    entities::booking,
    errors::{Error, Result},
    web::{AppState, bar::MemberOut, export},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::JsonValue;
use serde::{Deserialize, Serialize};

const HISTORY_PER_PAGE: u64 = 20;

/// Generic `{success}` response for deletions and similar operations.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Booking history & cancellation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub page: Option<u64>,
}

/// Booking row as shown in the history table.
#[derive(Debug, Serialize)]
pub struct BookingOut {
    pub id: i64,
    pub mitglied_id: i64,
    pub mitglied_name: String,
    pub artikel_id: Option<i64>,
    pub artikel_name: Option<String>,
    pub menge: i32,
    pub preis_pro_einheit: f64,
    pub gesamtpreis: f64,
    pub zeitstempel: DateTime<Utc>,
    pub storniert: Option<DateTime<Utc>>,
}

impl From<booking_core::BookingRow> for BookingOut {
    fn from(row: booking_core::BookingRow) -> Self {
        let booking::Model {
            id,
            mitglied_id,
            artikel_id,
            menge,
            preis_pro_einheit,
            gesamtpreis,
            zeitstempel,
            storniert,
        } = row.booking;
        Self {
            id,
            mitglied_id,
            mitglied_name: row.mitglied_name,
            artikel_id,
            artikel_name: row.artikel_name,
            menge,
            preis_pro_einheit,
            gesamtpreis,
            zeitstempel,
            storniert,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub buchungen: Vec<BookingOut>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// GET /api/admin/buchungen?start&end&page
pub async fn booking_history(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<HistoryResponse>> {
    let (start, end) = parse_daterange(query.start.as_deref(), query.end.as_deref());
    let page = query.page.unwrap_or(1);

    let history =
        booking_core::booking_history(&state.db, start, end, page, HISTORY_PER_PAGE).await?;

    Ok(Json(HistoryResponse {
        success: true,
        buchungen: history.rows.into_iter().map(Into::into).collect(),
        page: history.page,
        per_page: history.per_page,
        total_items: history.total_items,
        total_pages: history.total_pages,
    }))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub storniert: bool,
    pub new_balance: f64,
    pub new_stock: Option<i32>,
}

/// POST /api/admin/buchungen/{id}/toggle
pub async fn toggle_booking(
    State(state): State<AppState>,
    Path(buchung_id): Path<i64>,
) -> Result<Json<ToggleResponse>> {
    let receipt = booking_core::toggle_cancellation(&state.db, buchung_id, &state.policy).await?;

    Ok(Json(ToggleResponse {
        success: true,
        storniert: receipt.storniert,
        new_balance: receipt.new_balance,
        new_stock: receipt.new_stock,
    }))
}

/// GET /api/admin/buchungen/export?start&end - CSV download.
pub async fn export_bookings(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response> {
    let (start, end) = parse_daterange(query.start.as_deref(), query.end.as_deref());
    let rows = booking_core::bookings_in_range(&state.db, start, end).await?;

    let csv_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.booking.zeitstempel.format("%Y-%m-%d %H:%M").to_string(),
                row.mitglied_name.clone(),
                row.artikel_name.clone().unwrap_or_default(),
                row.booking.menge.to_string(),
                format!("{:.2}", row.booking.preis_pro_einheit),
                format!("{:.2}", row.booking.gesamtpreis),
                (if row.booking.is_cancelled() { "Ja" } else { "Nein" }).to_string(),
            ]
        })
        .collect();

    let body = export::csv_document(
        &[
            "Datum",
            "Mitglied",
            "Artikel",
            "Menge",
            "Preis/Einheit (EUR)",
            "Gesamtpreis (EUR)",
            "Storniert",
        ],
        &csv_rows,
    );
    let filename = format!(
        "buchungen_{}_{}.csv",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    Ok(export::csv_response(&filename, body))
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MembersListResponse {
    pub success: bool,
    pub mitglieder: Vec<MemberOut>,
}

/// GET /api/admin/mitglieder
pub async fn list_members(State(state): State<AppState>) -> Result<Json<MembersListResponse>> {
    let mitglieder = member_core::get_all_members(&state.db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(MembersListResponse {
        success: true,
        mitglieder,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub success: bool,
    pub mitglied: MemberOut,
}

/// POST /api/admin/mitglieder
pub async fn create_member(
    State(state): State<AppState>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<MemberResponse>> {
    let Some(name) = req.name else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let created = member_core::create_member(&state.db, name, req.nickname, req.email).await?;
    Ok(Json(MemberResponse {
        success: true,
        mitglied: created.into(),
    }))
}

/// PUT /api/admin/mitglieder/{id}
pub async fn update_member(
    State(state): State<AppState>,
    Path(mitglied_id): Path<i64>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<MemberResponse>> {
    let Some(name) = req.name else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let updated =
        member_core::update_member(&state.db, mitglied_id, name, req.nickname, req.email).await?;
    Ok(Json(MemberResponse {
        success: true,
        mitglied: updated.into(),
    }))
}

/// DELETE /api/admin/mitglieder/{id}
pub async fn delete_member(
    State(state): State<AppState>,
    Path(mitglied_id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    member_core::delete_member(&state.db, mitglied_id).await?;
    Ok(Json(StatusResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct RechargeRequest {
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RechargeResponse {
    pub success: bool,
    pub new_balance: f64,
    pub blacklist: bool,
}

/// POST /api/admin/mitglieder/{id}/aufladen
pub async fn recharge_member(
    State(state): State<AppState>,
    Path(mitglied_id): Path<i64>,
    Json(req): Json<RechargeRequest>,
) -> Result<Json<RechargeResponse>> {
    let Some(amount) = req.amount else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let receipt =
        booking_core::apply_balance_adjustment(&state.db, mitglied_id, amount, &state.policy)
            .await?;
    Ok(Json(RechargeResponse {
        success: true,
        new_balance: receipt.new_balance,
        blacklist: receipt.blacklist,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BlacklistRequest {
    pub blacklist: Option<bool>,
}

/// POST /api/admin/mitglieder/{id}/sperre
///
/// Manual override; the next balance-changing operation recomputes it.
pub async fn set_blacklist(
    State(state): State<AppState>,
    Path(mitglied_id): Path<i64>,
    Json(req): Json<BlacklistRequest>,
) -> Result<Json<MemberResponse>> {
    let Some(blacklist) = req.blacklist else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let updated = member_core::set_blacklist(&state.db, mitglied_id, blacklist).await?;
    Ok(Json(MemberResponse {
        success: true,
        mitglied: updated.into(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub applied: usize,
    pub skipped: usize,
}

/// POST /api/admin/mitglieder/import
///
/// Body: CSV lines `mitglied_id,amount`. Unparseable rows are skipped.
pub async fn import_balances(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportResponse>> {
    let summary = booking_core::import_balance_rows(&state.db, &body, &state.policy).await?;
    Ok(Json(ImportResponse {
        success: true,
        applied: summary.applied,
        skipped: summary.skipped,
    }))
}

/// GET /api/admin/mitglieder/export - CSV download.
pub async fn export_members(State(state): State<AppState>) -> Result<Response> {
    let members = member_core::get_all_members(&state.db).await?;
    let rows: Vec<Vec<String>> = members
        .iter()
        .map(|m| {
            vec![
                m.id.to_string(),
                m.name.clone(),
                m.nickname.clone().unwrap_or_default(),
                m.email.clone().unwrap_or_default(),
                format!("{:.2}", m.guthaben),
            ]
        })
        .collect();
    let body = export::csv_document(&["id", "name", "nickname", "email", "guthaben"], &rows);
    Ok(export::csv_response("mitglieder_export.csv", body))
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ArticleAdminOut {
    pub id: i64,
    pub name: String,
    pub preis: f64,
    pub bestand: i32,
    pub mindestbestand: i32,
    pub order: Option<i32>,
}

impl From<crate::entities::ArticleModel> for ArticleAdminOut {
    fn from(a: crate::entities::ArticleModel) -> Self {
        Self {
            id: a.id,
            name: a.name,
            preis: a.preis,
            bestand: a.bestand,
            mindestbestand: a.mindestbestand,
            order: a.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticlesListResponse {
    pub success: bool,
    pub artikel: Vec<ArticleAdminOut>,
}

/// GET /api/admin/artikel
pub async fn list_articles(State(state): State<AppState>) -> Result<Json<ArticlesListResponse>> {
    let artikel = article_core::get_all_articles(&state.db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(ArticlesListResponse {
        success: true,
        artikel,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub name: Option<String>,
    pub preis: Option<f64>,
    pub bestand: Option<i32>,
    pub mindestbestand: Option<i32>,
    pub order: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub success: bool,
    pub artikel: ArticleAdminOut,
}

/// POST /api/admin/artikel
pub async fn create_article(
    State(state): State<AppState>,
    Json(req): Json<ArticleRequest>,
) -> Result<Json<ArticleResponse>> {
    let (Some(name), Some(preis)) = (req.name, req.preis) else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let created = article_core::create_article(
        &state.db,
        name,
        preis,
        req.bestand.unwrap_or(0),
        req.mindestbestand,
        req.order,
        state.policy.default_minimum_stock,
    )
    .await?;
    Ok(Json(ArticleResponse {
        success: true,
        artikel: created.into(),
    }))
}

/// PUT /api/admin/artikel/{id}
pub async fn update_article(
    State(state): State<AppState>,
    Path(artikel_id): Path<i64>,
    Json(req): Json<ArticleRequest>,
) -> Result<Json<ArticleResponse>> {
    let (Some(name), Some(preis)) = (req.name, req.preis) else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let current = article_core::get_article_by_id(&state.db, artikel_id)
        .await?
        .ok_or(Error::ArticleNotFound { id: artikel_id })?;

    let updated = article_core::update_article(
        &state.db,
        artikel_id,
        name,
        preis,
        req.bestand.unwrap_or(current.bestand),
        req.mindestbestand.unwrap_or(current.mindestbestand),
        req.order.or(current.order),
    )
    .await?;
    Ok(Json(ArticleResponse {
        success: true,
        artikel: updated.into(),
    }))
}

/// DELETE /api/admin/artikel/{id}
pub async fn delete_article(
    State(state): State<AppState>,
    Path(artikel_id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    article_core::delete_article(&state.db, artikel_id).await?;
    Ok(Json(StatusResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub delta: Option<i32>,
}

/// POST /api/admin/artikel/{id}/bestand - administrative stock adjustment.
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(artikel_id): Path<i64>,
    Json(req): Json<StockRequest>,
) -> Result<Json<ArticleResponse>> {
    let Some(delta) = req.delta else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let updated = article_core::adjust_stock(&state.db, artikel_id, delta).await?;
    Ok(Json(ArticleResponse {
        success: true,
        artikel: updated.into(),
    }))
}

/// GET /api/admin/artikel/warnungen - articles below their threshold.
pub async fn low_stock(State(state): State<AppState>) -> Result<Json<ArticlesListResponse>> {
    let artikel = article_core::low_stock(&state.db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(ArticlesListResponse {
        success: true,
        artikel,
    }))
}

/// GET /api/admin/artikel/export - CSV download.
pub async fn export_articles(State(state): State<AppState>) -> Result<Response> {
    let articles = article_core::get_all_articles(&state.db).await?;
    let rows: Vec<Vec<String>> = articles
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.name.clone(),
                format!("{:.2}", a.preis),
                a.bestand.to_string(),
                a.mindestbestand.to_string(),
            ]
        })
        .collect();
    let body = export::csv_document(&["id", "name", "preis", "bestand", "mindestbestand"], &rows);
    Ok(export::csv_response("artikel_export.csv", body))
}

// ---------------------------------------------------------------------------
// Reports & SQL console
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: report::RevenueSummary,
}

/// GET /api/admin/berichte/umsatz?start&end
pub async fn revenue_report(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RevenueResponse>> {
    let (start, end) = parse_daterange(query.start.as_deref(), query.end.as_deref());
    let summary = report::revenue_summary(&state.db, start, end).await?;
    Ok(Json(RevenueResponse {
        success: true,
        summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct ArticleSalesResponse {
    pub success: bool,
    pub artikel: Vec<report::ArticleSales>,
}

/// GET /api/admin/berichte/artikel?start&end
pub async fn article_report(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ArticleSalesResponse>> {
    let (start, end) = parse_daterange(query.start.as_deref(), query.end.as_deref());
    let artikel = report::article_sales(&state.db, start, end).await?;
    Ok(Json(ArticleSalesResponse {
        success: true,
        artikel,
    }))
}

#[derive(Debug, Serialize)]
pub struct BalanceReportResponse {
    pub success: bool,
    #[serde(flatten)]
    pub sheet: report::BalanceSheet,
}

/// GET /api/admin/berichte/guthaben
pub async fn balance_report(State(state): State<AppState>) -> Result<Json<BalanceReportResponse>> {
    let sheet = report::member_balances(&state.db).await?;
    Ok(Json(BalanceReportResponse {
        success: true,
        sheet,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SqlResponse {
    pub success: bool,
    pub rows: Vec<JsonValue>,
}

/// POST /api/admin/sql - ad-hoc read-only query.
pub async fn sql_console(
    State(state): State<AppState>,
    Json(req): Json<SqlRequest>,
) -> Result<Json<SqlResponse>> {
    let Some(query) = req.query else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let rows = report::execute_readonly(&state.readonly_db, &query).await?;
    Ok(Json(SqlResponse {
        success: true,
        rows,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReportsListResponse {
    pub success: bool,
    pub berichte: Vec<crate::entities::ReportModel>,
}

/// GET /api/admin/berichte
pub async fn list_reports(State(state): State<AppState>) -> Result<Json<ReportsListResponse>> {
    let berichte = report::list_reports(&state.db).await?;
    Ok(Json(ReportsListResponse {
        success: true,
        berichte,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SaveReportRequest {
    pub name: Option<String>,
    pub sql: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedReportResponse {
    pub success: bool,
    pub bericht: crate::entities::ReportModel,
}

/// POST /api/admin/berichte
pub async fn save_report(
    State(state): State<AppState>,
    Json(req): Json<SaveReportRequest>,
) -> Result<Json<SavedReportResponse>> {
    let (Some(name), Some(sql)) = (req.name, req.sql) else {
        return Err(Error::validation("Fehlende Daten."));
    };
    let bericht = report::save_report(&state.db, name, sql).await?;
    Ok(Json(SavedReportResponse {
        success: true,
        bericht,
    }))
}

/// DELETE /api/admin/berichte/{id}
pub async fn delete_report(
    State(state): State<AppState>,
    Path(bericht_id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    report::delete_report(&state.db, bericht_id).await?;
    Ok(Json(StatusResponse { success: true }))
}

/// POST /api/admin/berichte/{id}/run
pub async fn run_report(
    State(state): State<AppState>,
    Path(bericht_id): Path<i64>,
) -> Result<Json<SqlResponse>> {
    let rows = report::run_report(&state.db, &state.readonly_db, bericht_id).await?;
    Ok(Json(SqlResponse {
        success: true,
        rows,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reads the start/end query parameters and returns the UTC range.
///
/// Defaults: end = today, start = end - 30 days. The end date is inclusive,
/// so the returned upper bound is the start of the following day.
fn parse_daterange(start: Option<&str>, end: Option<&str>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = Utc::now().date_naive();
    let end_date = end
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or(today);
    let start_date = start
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| end_date - Duration::days(30));

    let start_dt = start_date.and_time(NaiveTime::MIN).and_utc();
    let end_dt = end_date
        .checked_add_days(chrono::Days::new(1))
        .unwrap_or(end_date)
        .and_time(NaiveTime::MIN)
        .and_utc();
    (start_dt, end_dt)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_daterange_explicit() {
        let (start, end) = parse_daterange(Some("2026-01-01"), Some("2026-01-31"));
        assert_eq!(start.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        // End date is inclusive
        assert_eq!(end.to_rfc3339(), "2026-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_daterange_defaults_to_last_30_days() {
        let (start, end) = parse_daterange(None, None);
        assert_eq!(end - start, Duration::days(31));
    }

    #[test]
    fn test_parse_daterange_ignores_garbage() {
        let (start, end) = parse_daterange(Some("not-a-date"), Some("2026-01-31"));
        assert_eq!(
            start.date_naive(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
        assert_eq!(
            end.date_naive(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
    }
}

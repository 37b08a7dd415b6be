//! Bar-side endpoints: member search, article list, purchase.
//!
//! These are the unauthenticated tablet endpoints. They share the exact
//! validation and effects of the booking core with the admin surface; the
//! handlers only translate between the wire shapes and the core functions.

use crate::{
    core::{article as article_core, booking as booking_core, member as member_core},
    entities::{article, member},
    errors::{Error, Result},
    web::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

/// Member as shown to the bar tablet.
#[derive(Debug, Serialize)]
pub struct MemberOut {
    pub id: i64,
    pub name: String,
    pub nickname: Option<String>,
    pub guthaben: f64,
    pub blacklist: bool,
}

impl From<member::Model> for MemberOut {
    fn from(m: member::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            nickname: m.nickname,
            guthaben: m.guthaben,
            blacklist: m.blacklist,
        }
    }
}

/// Article as shown to the bar tablet.
#[derive(Debug, Serialize)]
pub struct ArticleOut {
    pub id: i64,
    pub name: String,
    pub preis: f64,
    pub bestand: i32,
    pub order: Option<i32>,
}

impl From<article::Model> for ArticleOut {
    fn from(a: article::Model) -> Self {
        Self {
            id: a.id,
            name: a.name,
            preis: a.preis,
            bestand: a.bestand,
            order: a.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub success: bool,
    pub members: Vec<MemberOut>,
}

#[derive(Debug, Deserialize)]
pub struct MemberSearchQuery {
    pub search: Option<String>,
}

/// GET /api/mitglieder?search=
///
/// A non-empty query searches name and nickname; an empty query returns the
/// hotlist of the most frequent recent purchasers.
pub async fn members(
    State(state): State<AppState>,
    Query(query): Query<MemberSearchQuery>,
) -> Result<Json<MembersResponse>> {
    let term = query.search.unwrap_or_default();
    let term = term.trim();

    let members: Vec<MemberOut> = if term.is_empty() {
        booking_core::purchase_hotlist(&state.db, state.policy.hotlist_window)
            .await?
            .into_iter()
            .map(|entry| entry.member.into())
            .collect()
    } else {
        member_core::search_members(&state.db, term)
            .await?
            .into_iter()
            .map(Into::into)
            .collect()
    };

    Ok(Json(MembersResponse {
        success: true,
        members,
    }))
}

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    pub success: bool,
    pub artikel: Vec<ArticleOut>,
}

/// GET /api/artikel
pub async fn articles(State(state): State<AppState>) -> Result<Json<ArticlesResponse>> {
    let artikel = article_core::get_all_articles(&state.db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ArticlesResponse {
        success: true,
        artikel,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub mitglied_id: Option<i64>,
    pub artikel_id: Option<i64>,
    pub menge: Option<i32>,
}

/// Purchase confirmation, mirroring the original wire shape.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub message: String,
    pub new_balance: f64,
    pub artikel_name: String,
    pub menge: i32,
    pub gesamtpreis: f64,
    pub new_artikel_bestand: i32,
    pub blacklist: bool,
}

/// POST /api/buchen
pub async fn purchase(
    State(state): State<AppState>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>> {
    let (Some(mitglied_id), Some(artikel_id), Some(menge)) =
        (req.mitglied_id, req.artikel_id, req.menge)
    else {
        return Err(Error::validation("Fehlende Daten."));
    };

    let receipt =
        booking_core::create_booking(&state.db, mitglied_id, artikel_id, menge, &state.policy)
            .await?;

    Ok(Json(PurchaseResponse {
        success: true,
        message: "Buchung erfolgreich!".to_string(),
        new_balance: receipt.new_balance,
        artikel_name: receipt.artikel_name,
        menge: receipt.booking.menge,
        gesamtpreis: receipt.booking.gesamtpreis,
        new_artikel_bestand: receipt.new_stock,
        blacklist: receipt.blacklist,
    }))
}

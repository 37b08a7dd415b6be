//! Booking entity - A recorded purchase or manual ledger adjustment.
//!
//! `artikel_id` is `None` for manual balance adjustments (recharges and
//! imports). `preis_pro_einheit` is a snapshot of the article price at
//! purchase time and is never recomputed; `gesamtpreis` is stored alongside
//! it. `storniert` is the cancellation marker: `None` means active,
//! `Some(t)` means cancelled at `t`. A booking's effect on the member
//! balance is always `guthaben -= gesamtpreis`, so manual adjustments encode
//! credits as negative totals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Booking database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "buchung")]
pub struct Model {
    /// Unique identifier for the booking
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member this booking belongs to
    pub mitglied_id: i64,
    /// Purchased article, `None` for manual ledger adjustments
    pub artikel_id: Option<i64>,
    /// Purchased quantity
    pub menge: i32,
    /// Unit price at purchase time (snapshot)
    pub preis_pro_einheit: f64,
    /// Stored total: `menge * preis_pro_einheit`
    pub gesamtpreis: f64,
    /// Creation time, immutable
    pub zeitstempel: DateTimeUtc,
    /// Cancellation marker: `None` = active, `Some(t)` = cancelled at `t`
    pub storniert: Option<DateTimeUtc>,
}

/// Defines relationships between Booking and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each booking belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MitgliedId",
        to = "super::member::Column::Id"
    )]
    Member,
    /// Each article booking references one article
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArtikelId",
        to = "super::article::Column::Id"
    )]
    Article,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this booking is currently cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.storniert.is_some()
    }
}

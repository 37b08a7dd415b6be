//! Article entity - Represents a purchasable item (drink, snack, etc.).
//!
//! Stores the unit price, the current stock count and the minimum-stock
//! threshold that drives the admin low-stock warning list. Stock is only
//! mutated by the booking core or an explicit administrative adjustment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Article database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artikel")]
pub struct Model {
    /// Unique identifier for the article
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Optional display order for the bar-side article grid
    pub order: Option<i32>,
    /// Article name, unique across the table
    #[sea_orm(unique)]
    pub name: String,
    /// Unit price in euros, non-negative
    pub preis: f64,
    /// Current stock count; reversals may drive it negative
    pub bestand: i32,
    /// Low-stock warning threshold
    pub mindestbestand: i32,
}

/// Defines relationships between Article and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One article has many bookings
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Member entity - Represents an account holder with a prepaid balance.
//!
//! Each member has a name, optional nickname and email, a signed balance
//! (`guthaben`, may go negative) and a blacklist flag. The balance is only
//! mutated through the booking core or an explicit administrative recharge.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mitglied")]
pub struct Model {
    /// Unique identifier for the member
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full display name
    pub name: String,
    /// Optional nickname used for bar-side search
    pub nickname: Option<String>,
    /// Optional unique email, used as the match key for member imports
    #[sea_orm(unique)]
    pub email: Option<String>,
    /// Current prepaid balance in euros, signed
    pub guthaben: f64,
    /// Purchase block flag, recomputed against the minimum-balance threshold
    pub blacklist: bool,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One member has many bookings
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Saved report entity - a named read-only SQL query for the admin console.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Saved report database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bericht")]
pub struct Model {
    /// Unique identifier for the report
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// The stored query; must pass the read-only guard when executed
    pub sql: String,
}

/// Saved reports have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! SKU sequence entity - One counter row per `CAT-PRD` prefix.
//!
//! `last_number` is the last sequence value handed out for the prefix. Rows are
//! created lazily on the first allocation and are never deleted or decremented.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SKU sequence counter model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sku_sequences")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Counter key, e.g. `"ELE-SMA"`
    #[sea_orm(unique)]
    pub prefix: String,
    /// Last allocated sequence value (0 before the first allocation)
    pub last_number: i32,
    /// When the counter was last bumped
    pub updated_at: DateTime,
}

/// Sequence counters stand alone
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

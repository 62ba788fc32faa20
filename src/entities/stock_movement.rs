//! Stock movement entity - Audit trail of every stock quantity change.
//!
//! `quantity` is signed: positive for stock coming in, negative for stock going
//! out. Adjustments carry whichever sign the correction needs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of stock movement
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock in
    #[sea_orm(string_value = "IN")]
    In,
    /// Stock out
    #[sea_orm(string_value = "OUT")]
    Out,
    /// Adjustment
    #[sea_orm(string_value = "ADJUST")]
    Adjust,
    /// Transfer
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    /// Return
    #[sea_orm(string_value = "RETURN")]
    Return,
    /// Damage/Loss
    #[sea_orm(string_value = "DAMAGE")]
    Damage,
}

/// Stock movement database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    /// Unique identifier for the movement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product whose stock changed
    pub product_id: i64,
    /// Batch that changed, if any
    pub stock_id: Option<i64>,
    /// Kind of movement
    pub movement_type: MovementType,
    /// Signed quantity, never zero
    pub quantity: i32,
    /// Cost per unit at the time of the movement
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub unit_cost: Option<Decimal>,
    /// Invoice number, order id, POS transaction, ...
    pub reference: String,
    /// Additional notes or reason
    pub note: String,
    /// When the movement was recorded
    pub created_at: DateTime,
    /// When the movement was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between `StockMovement` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each movement belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// A movement may reference the batch it changed
    #[sea_orm(
        belongs_to = "super::stock::Entity",
        from = "Column::StockId",
        to = "super::stock::Column::Id",
        on_delete = "SetNull"
    )]
    Stock,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

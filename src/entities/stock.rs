//! Stock entity - One batch (lot) of a product with its own cost, expiry and location.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stock batch database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stocks")]
pub struct Model {
    /// Unique identifier for the batch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product this batch belongs to
    pub product_id: i64,
    /// Batch / lot number, unique per product
    pub batch_no: String,
    /// Optional expiry date
    pub expiry_date: Option<Date>,
    /// Units currently held in this batch
    pub quantity: i32,
    /// Cost per unit for this batch
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_cost: Decimal,
    /// Storage location, empty when unknown
    pub location: String,
    /// Inactive batches do not count toward the product quantity
    pub is_active: bool,
    /// When the batch was received
    pub created_at: DateTime,
    /// When the batch was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Stock and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each batch belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// One batch has many movements
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    Movements,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

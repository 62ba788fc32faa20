//! Product entity - Product master data with pricing, inventory and settings.
//!
//! Prices are stored as two-place decimals. The four price points must satisfy
//! `unit_cost <= least_selling_price <= wholesale_price <= retail_price`; that is
//! enforced by `core::pricing` before any row is written. `quantity` is a cached
//! sum of the product's active stock batches.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Unit of measure a product is sold in
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Pieces
    #[default]
    #[sea_orm(string_value = "pcs")]
    Pcs,
    /// Kilogram
    #[sea_orm(string_value = "kg")]
    Kg,
    /// Gram
    #[sea_orm(string_value = "g")]
    G,
    /// Liter
    #[sea_orm(string_value = "l")]
    L,
    /// Milliliter
    #[sea_orm(string_value = "ml")]
    Ml,
    /// Box
    #[sea_orm(string_value = "box")]
    Box,
    /// Pack
    #[sea_orm(string_value = "pack")]
    Pack,
    /// Bottle
    #[sea_orm(string_value = "bottle")]
    Bottle,
    /// Can
    #[sea_orm(string_value = "can")]
    Can,
    /// Bag
    #[sea_orm(string_value = "bag")]
    Bag,
}

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stock keeping unit, `CAT-PRD-0001` when generated; never changes
    #[sea_orm(unique)]
    pub sku: String,
    /// Optional barcode, unique when present
    #[sea_orm(unique)]
    pub barcode: Option<String>,
    /// Display name
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Owning category
    pub category_id: i64,
    /// Cost price per unit
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_cost: Decimal,
    /// Floor price a cashier may sell at
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub least_selling_price: Decimal,
    /// Bulk price
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub wholesale_price: Decimal,
    /// Shelf price
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub retail_price: Decimal,
    /// Current stock quantity, summed from active batches
    pub quantity: i32,
    /// At or below this quantity the product needs reordering
    pub reorder_level: i32,
    /// Unit of measure
    pub unit: Unit,
    /// Number of units in one pack
    pub pack_size: i32,
    /// Whether sales tax applies
    pub taxable: bool,
    /// Discount applied to the retail price, in percent
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount_percent: Decimal,
    /// Featured / special item
    pub is_special: bool,
    /// Listed in the online shop
    pub is_online: bool,
    /// Inactive products are hidden from sale but keep their history
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// One product has many stock batches
    #[sea_orm(has_many = "super::stock::Entity")]
    Stocks,
    /// One product has many stock movements
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    Movements,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stocks.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

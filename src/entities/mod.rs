//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category;
pub mod product;
pub mod sku_sequence;
pub mod stock;
pub mod stock_movement;

// Re-export specific types to avoid conflicts
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel, Unit};
pub use sku_sequence::{
    Column as SkuSequenceColumn, Entity as SkuSequence, Model as SkuSequenceModel,
};
pub use stock::{Column as StockColumn, Entity as Stock, Model as StockModel};
pub use stock_movement::{
    Column as StockMovementColumn, Entity as StockMovement, Model as StockMovementModel,
    MovementType,
};

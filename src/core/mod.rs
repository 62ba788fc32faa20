//! Core business logic - framework-agnostic catalog, pricing and stock operations.

/// Category management
pub mod category;
/// Price hierarchy validation and derived prices
pub mod pricing;
/// Product management, filters and derived values
pub mod product;
/// SKU prefixes, codes and atomic sequence allocation
pub mod sku;
/// Stock batches and movements
pub mod stock;

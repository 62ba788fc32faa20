//! Unified error type for the inventory core.
//!
//! Every failure is reported to the immediate caller; nothing here is retried.
//! Validation errors name the exact field or invariant that was violated so a
//! request handler can turn them into precise messages.

use crate::core::pricing::PriceField;
use rust_decimal::Decimal;
use thiserror::Error;

/// All errors produced by `stockroom`.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Configuration file or environment problem
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Generic input validation failure (empty names, bad sizes, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// What went wrong
        message: String,
    },

    /// A price was negative, malformed or carried too much precision
    #[error("Invalid {field}: {reason}")]
    InvalidPrice {
        /// Which price point was rejected
        field: PriceField,
        /// Why it was rejected
        reason: String,
    },

    /// Two adjacent price tiers are out of order
    #[error(
        "Pricing hierarchy violated: {lower} ({lower_value}) must not exceed {higher} ({higher_value})"
    )]
    PricingHierarchyViolation {
        /// The tier that must be the smaller one
        lower: PriceField,
        /// The tier that must be the larger one
        higher: PriceField,
        /// Submitted value of `lower`
        lower_value: Decimal,
        /// Submitted value of `higher`
        higher_value: Decimal,
    },

    /// Discount percentage outside 0..=100
    #[error("Invalid discount percentage: {percent}")]
    InvalidDiscount {
        /// The rejected percentage
        percent: Decimal,
    },

    /// All 9999 codes for a prefix have been handed out
    #[error("SKU sequence exhausted for prefix {prefix}")]
    ExhaustedSequence {
        /// The CAT-PRD prefix with no codes left
        prefix: String,
    },

    /// A string is not a well-formed SKU code
    #[error("Invalid SKU: {sku}")]
    InvalidSku {
        /// The rejected input
        sku: String,
    },

    /// A product with this SKU already exists
    #[error("SKU already in use: {sku}")]
    DuplicateSku {
        /// The conflicting SKU
        sku: String,
    },

    /// A product with this barcode already exists
    #[error("Barcode already in use: {barcode}")]
    DuplicateBarcode {
        /// The conflicting barcode
        barcode: String,
    },

    /// No category with the given identifier
    #[error("Category not found: {name}")]
    CategoryNotFound {
        /// Name or id used for the lookup
        name: String,
    },

    /// Category names are unique
    #[error("Category already exists: {name}")]
    DuplicateCategory {
        /// The conflicting name
        name: String,
    },

    /// Category still referenced by products
    #[error("Category {name} is still used by {products} product(s)")]
    CategoryInUse {
        /// Category name
        name: String,
        /// Number of products referencing it
        products: u64,
    },

    /// No product with the given identifier
    #[error("Product not found: {name}")]
    ProductNotFound {
        /// Name, id or SKU used for the lookup
        name: String,
    },

    /// No stock batch with the given identifier
    #[error("Stock batch not found: {id}")]
    StockNotFound {
        /// Batch id
        id: i64,
    },

    /// Quantity is zero, negative where it must be positive, or has the wrong sign
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: i64,
    },

    /// Not enough active stock to satisfy a removal
    #[error("Insufficient stock. Requested: {requested}, Available: {available}")]
    InsufficientStock {
        /// Units asked for
        requested: i64,
        /// Units held in active batches
        available: i64,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

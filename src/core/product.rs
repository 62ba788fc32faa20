//! Product business logic - Handles all product-related operations.
//!
//! This module provides functions for creating, retrieving, updating, and removing products.
//! Creating a product validates its prices before anything is written, then allocates a SKU
//! and inserts the row inside one transaction, so a rejected product never consumes a
//! sequence number and a committed product always owns the number it was given.

use crate::{
    core::{
        category::get_category_by_id,
        pricing::{self, PriceSet, PriceUpdate},
        sku::{self, SkuCode},
    },
    entities::{Product, Stock, StockMovement, Unit, product, stock, stock_movement},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{
    Condition, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Deserialize;
use tracing::{info, instrument};

/// Longest SKU a caller may assign by hand
pub const MAX_MANUAL_SKU_LEN: usize = 20;

/// Reorder threshold used when none is given
pub const DEFAULT_REORDER_LEVEL: i32 = 10;

/// Everything needed to create a product.
#[derive(Clone, Debug, Deserialize)]
pub struct NewProduct {
    /// Display name, also the source of the SKU's second segment
    pub name: String,
    /// Owning category
    pub category_id: i64,
    /// The four price points
    pub prices: PriceSet,
    /// Hand-assigned SKU; generated when `None`
    #[serde(default)]
    pub sku: Option<String>,
    /// Optional barcode
    #[serde(default)]
    pub barcode: Option<String>,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Reorder threshold
    pub reorder_level: i32,
    /// Unit of measure
    #[serde(default)]
    pub unit: Unit,
    /// Units per pack
    pub pack_size: i32,
    /// Whether sales tax applies
    pub taxable: bool,
    /// Discount on the retail price in percent
    pub discount_percent: Decimal,
    /// Featured item
    pub is_special: bool,
    /// Listed online
    pub is_online: bool,
    /// Available for sale
    pub is_active: bool,
}

impl NewProduct {
    /// A product with the given name, category and prices and default settings.
    #[must_use]
    pub fn new(name: impl Into<String>, category_id: i64, prices: PriceSet) -> Self {
        Self {
            name: name.into(),
            category_id,
            prices,
            sku: None,
            barcode: None,
            description: None,
            reorder_level: DEFAULT_REORDER_LEVEL,
            unit: Unit::default(),
            pack_size: 1,
            taxable: true,
            discount_percent: Decimal::ZERO,
            is_special: false,
            is_online: true,
            is_active: true,
        }
    }
}

/// A partial product update; `None` leaves the stored value alone.
///
/// The SKU is not part of an update: once assigned it never changes.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductUpdate {
    /// New name
    pub name: Option<String>,
    /// New description (`Some(None)` clears it)
    pub description: Option<Option<String>>,
    /// New barcode (`Some(None)` clears it)
    pub barcode: Option<Option<String>>,
    /// Move to another category
    pub category_id: Option<i64>,
    /// Price changes, merged with stored prices before validation
    #[serde(default)]
    pub prices: PriceUpdate,
    /// New reorder threshold
    pub reorder_level: Option<i32>,
    /// New unit of measure
    pub unit: Option<Unit>,
    /// New pack size
    pub pack_size: Option<i32>,
    /// New tax flag
    pub taxable: Option<bool>,
    /// New discount percentage
    pub discount_percent: Option<Decimal>,
    /// New special flag
    pub is_special: Option<bool>,
    /// New online flag
    pub is_online: Option<bool>,
    /// New active flag
    pub is_active: Option<bool>,
}

/// Filters for [`list_products`]. Unset fields do not filter.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter {
    /// Only products in this category
    pub category_id: Option<i64>,
    /// Match the active flag
    pub is_active: Option<bool>,
    /// Match the online flag
    pub is_online: Option<bool>,
    /// Match the special flag
    pub is_special: Option<bool>,
    /// Match the tax flag
    pub taxable: Option<bool>,
    /// Only products at or below their reorder level
    #[serde(default)]
    pub low_stock_only: bool,
    /// Substring match on name, SKU, barcode or description
    pub search: Option<String>,
}

impl product::Model {
    /// The product's four price points
    #[must_use]
    pub const fn price_set(&self) -> PriceSet {
        PriceSet::new(
            self.unit_cost,
            self.least_selling_price,
            self.wholesale_price,
            self.retail_price,
        )
    }

    /// At or below the reorder level
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Stock counted in single units, taking the pack size into account
    #[must_use]
    pub fn available_stock(&self) -> i64 {
        i64::from(self.quantity) * i64::from(self.pack_size)
    }

    /// Retail price after the product's discount
    #[must_use]
    pub fn discounted_price(&self) -> Decimal {
        pricing::discounted_price(self.retail_price, self.discount_percent)
    }

    /// Markup on cost in percent
    #[must_use]
    pub fn profit_margin(&self) -> Decimal {
        pricing::profit_margin(self.unit_cost, self.retail_price)
    }
}

fn clean_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: "Product name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_settings(reorder_level: i32, pack_size: i32) -> Result<()> {
    if pack_size <= 0 {
        return Err(Error::Validation {
            message: format!("Pack size must be positive, got {pack_size}"),
        });
    }
    if reorder_level < 0 {
        return Err(Error::Validation {
            message: format!("Reorder level cannot be negative, got {reorder_level}"),
        });
    }
    Ok(())
}

async fn ensure_barcode_free(
    db: &DatabaseConnection,
    barcode: &str,
    owner: Option<i64>,
) -> Result<()> {
    let existing = Product::find()
        .filter(product::Column::Barcode.eq(barcode))
        .one(db)
        .await?;
    match existing {
        Some(other) if Some(other.id) != owner => Err(Error::DuplicateBarcode {
            barcode: barcode.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Maps a unique violation on product insert to the column that clashed.
///
/// Barcode and SKU are re-checked before insert; this covers a concurrent writer
/// taking either value in between.
fn insert_conflict(err: DbErr, sku: &str, barcode: Option<&str>) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => match barcode {
            Some(code) if message.contains("barcode") => Error::DuplicateBarcode {
                barcode: code.to_string(),
            },
            _ => Error::DuplicateSku {
                sku: sku.to_string(),
            },
        },
        _ => err.into(),
    }
}

/// Creates a product, generating its SKU unless one is supplied.
///
/// Validation happens before the transaction starts, so a rejected product never
/// consumes a SKU number.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The prices break the pricing hierarchy or are not valid prices
/// - The discount is outside 0..=100, the pack size is not positive or the reorder level is negative
/// - The category does not exist
/// - The barcode or the manual SKU is already in use, or the manual SKU is blank or too long
/// - The SKU sequence for the prefix is exhausted
/// - The database insert fails
#[instrument(skip(db, new), fields(name = %new.name, category_id = new.category_id))]
pub async fn create_product(db: &DatabaseConnection, new: NewProduct) -> Result<product::Model> {
    let name = clean_name(&new.name)?;
    new.prices.validate()?;
    pricing::validate_discount(new.discount_percent)?;
    check_settings(new.reorder_level, new.pack_size)?;

    let category = get_category_by_id(db, new.category_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: new.category_id.to_string(),
        })?;

    let barcode = clean_optional(new.barcode);
    if let Some(code) = &barcode {
        ensure_barcode_free(db, code, None).await?;
    }

    let manual_sku = match new.sku.as_deref().map(str::trim) {
        None => None,
        // generated-format codes belong to the counters
        Some(s)
            if s.is_empty() || s.len() > MAX_MANUAL_SKU_LEN || s.parse::<SkuCode>().is_ok() =>
        {
            return Err(Error::InvalidSku { sku: s.to_string() });
        }
        Some(s) => {
            if get_product_by_sku(db, s).await?.is_some() {
                return Err(Error::DuplicateSku { sku: s.to_string() });
            }
            Some(s.to_string())
        }
    };

    let txn = db.begin().await?;

    let sku = match manual_sku {
        Some(s) => s,
        None => sku::next_sku(&txn, &category.name, &name).await?.into(),
    };

    let now = chrono::Utc::now().naive_utc();
    let prices = new.prices;
    let product = product::ActiveModel {
        sku: Set(sku.clone()),
        barcode: Set(barcode.clone()),
        name: Set(name),
        description: Set(clean_optional(new.description)),
        category_id: Set(category.id),
        unit_cost: Set(prices.unit_cost),
        least_selling_price: Set(prices.least_selling_price),
        wholesale_price: Set(prices.wholesale_price),
        retail_price: Set(prices.retail_price),
        quantity: Set(0),
        reorder_level: Set(new.reorder_level),
        unit: Set(new.unit),
        pack_size: Set(new.pack_size),
        taxable: Set(new.taxable),
        discount_percent: Set(new.discount_percent),
        is_special: Set(new.is_special),
        is_online: Set(new.is_online),
        is_active: Set(new.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = product
        .insert(&txn)
        .await
        .map_err(|e| insert_conflict(e, &sku, barcode.as_deref()))?;
    txn.commit().await?;

    info!(id = created.id, sku = %created.sku, "Created product");
    Ok(created)
}

/// Applies a partial update to a product.
///
/// Price changes are merged with the stored prices and the full set is validated again.
///
/// # Errors
/// Returns an error if:
/// - The product or the new category does not exist
/// - Any changed value fails the same validation as [`create_product`]
/// - The new barcode belongs to another product
/// - The database update fails
#[instrument(skip(db, update))]
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    update: ProductUpdate,
) -> Result<product::Model> {
    let existing = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: product_id.to_string(),
        })?;

    let prices = existing.price_set().merge(&update.prices);
    prices.validate()?;
    if let Some(percent) = update.discount_percent {
        pricing::validate_discount(percent)?;
    }
    check_settings(
        update.reorder_level.unwrap_or(existing.reorder_level),
        update.pack_size.unwrap_or(existing.pack_size),
    )?;

    let mut product: product::ActiveModel = existing.into();

    if let Some(name) = update.name {
        product.name = Set(clean_name(&name)?);
    }
    if let Some(description) = update.description {
        product.description = Set(clean_optional(description));
    }
    if let Some(barcode) = update.barcode {
        let barcode = clean_optional(barcode);
        if let Some(code) = &barcode {
            ensure_barcode_free(db, code, Some(product_id)).await?;
        }
        product.barcode = Set(barcode);
    }
    if let Some(category_id) = update.category_id {
        get_category_by_id(db, category_id)
            .await?
            .ok_or_else(|| Error::CategoryNotFound {
                name: category_id.to_string(),
            })?;
        product.category_id = Set(category_id);
    }

    product.unit_cost = Set(prices.unit_cost);
    product.least_selling_price = Set(prices.least_selling_price);
    product.wholesale_price = Set(prices.wholesale_price);
    product.retail_price = Set(prices.retail_price);

    if let Some(level) = update.reorder_level {
        product.reorder_level = Set(level);
    }
    if let Some(unit) = update.unit {
        product.unit = Set(unit);
    }
    if let Some(size) = update.pack_size {
        product.pack_size = Set(size);
    }
    if let Some(taxable) = update.taxable {
        product.taxable = Set(taxable);
    }
    if let Some(percent) = update.discount_percent {
        product.discount_percent = Set(percent);
    }
    if let Some(special) = update.is_special {
        product.is_special = Set(special);
    }
    if let Some(online) = update.is_online {
        product.is_online = Set(online);
    }
    if let Some(active) = update.is_active {
        product.is_active = Set(active);
    }
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    product.update(db).await.map_err(Into::into)
}

/// Retrieves a product by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product by its exact SKU.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_sku(
    db: &DatabaseConnection,
    sku: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Sku.eq(sku))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists products matching `filter`, ordered by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_products(
    db: &DatabaseConnection,
    filter: &ProductFilter,
) -> Result<Vec<product::Model>> {
    let mut query = Product::find().order_by_asc(product::Column::Name);

    if let Some(category_id) = filter.category_id {
        query = query.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(active) = filter.is_active {
        query = query.filter(product::Column::IsActive.eq(active));
    }
    if let Some(online) = filter.is_online {
        query = query.filter(product::Column::IsOnline.eq(online));
    }
    if let Some(special) = filter.is_special {
        query = query.filter(product::Column::IsSpecial.eq(special));
    }
    if let Some(taxable) = filter.taxable {
        query = query.filter(product::Column::Taxable.eq(taxable));
    }
    if filter.low_stock_only {
        query = query.filter(
            Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::ReorderLevel)),
        );
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(product::Column::Name.contains(term))
                .add(product::Column::Sku.contains(term))
                .add(product::Column::Barcode.contains(term))
                .add(product::Column::Description.contains(term)),
        );
    }

    query.all(db).await.map_err(Into::into)
}

/// Marks a product inactive, keeping its stock and history.
///
/// # Errors
/// Returns an error if the product does not exist or the update fails.
pub async fn deactivate_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    update_product(
        db,
        product_id,
        ProductUpdate {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
}

/// Deletes a product together with its stock batches and movements.
///
/// The SKU counter is left alone, so the deleted product's number is never reused.
///
/// # Errors
/// Returns an error if the product does not exist or a delete fails.
#[instrument(skip(db))]
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    let txn = db.begin().await?;

    let product = get_product_by_id(&txn, product_id)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: product_id.to_string(),
        })?;

    StockMovement::delete_many()
        .filter(stock_movement::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Stock::delete_many()
        .filter(stock::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Product::delete_by_id(product_id).exec(&txn).await?;

    txn.commit().await?;
    info!(sku = %product.sku, "Deleted product");
    Ok(product)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::pricing::PriceField, test_utils::*};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_product_generates_sku() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let first = create_test_product(&db, "Smartphone", category.id).await?;
        let second = create_test_product(&db, "Smart Speaker", category.id).await?;

        assert_eq!(first.sku, "ELE-SMA-0001");
        assert_eq!(second.sku, "ELE-SMA-0002");
        assert_eq!(first.quantity, 0);
        assert_eq!(first.unit, Unit::Pcs);
        assert!(first.is_active);
        assert_eq!(first.retail_price, dec!(999.99));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let result = create_product(&db, NewProduct::new("  ", category.id, test_prices())).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let bad_prices = PriceSet::new(dec!(100), dec!(90), dec!(150), dec!(200));
        let result = create_product(&db, NewProduct::new("Phone", category.id, bad_prices)).await;
        assert!(matches!(
            result,
            Err(Error::PricingHierarchyViolation {
                lower: PriceField::UnitCost,
                higher: PriceField::LeastSellingPrice,
                ..
            })
        ));

        let negative = PriceSet::new(dec!(-5), dec!(10), dec!(20), dec!(30));
        let result = create_product(&db, NewProduct::new("Phone", category.id, negative)).await;
        assert!(matches!(result, Err(Error::InvalidPrice { .. })));

        let mut new = NewProduct::new("Phone", category.id, test_prices());
        new.discount_percent = dec!(150);
        let result = create_product(&db, new).await;
        assert!(matches!(result, Err(Error::InvalidDiscount { .. })));

        let mut new = NewProduct::new("Phone", category.id, test_prices());
        new.pack_size = 0;
        let result = create_product(&db, new).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_product(&db, NewProduct::new("Phone", 999, test_prices())).await;
        assert!(matches!(result, Err(Error::CategoryNotFound { .. })));

        // nothing above reached the SKU counter
        assert!(sku::find_counter(&db, "ELE-PHO").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_manual_sku_is_preserved() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let mut new = NewProduct::new("Test Product", category.id, test_prices());
        new.sku = Some("MANUAL-SKU-001".to_string());
        let product = create_product(&db, new).await?;
        assert_eq!(product.sku, "MANUAL-SKU-001");
        assert!(sku::find_counter(&db, "ELE-TES").await?.is_none());

        let mut duplicate = NewProduct::new("Other", category.id, test_prices());
        duplicate.sku = Some("MANUAL-SKU-001".to_string());
        let result = create_product(&db, duplicate).await;
        assert!(matches!(result, Err(Error::DuplicateSku { .. })));

        let mut too_long = NewProduct::new("Other", category.id, test_prices());
        too_long.sku = Some("X".repeat(MAX_MANUAL_SKU_LEN + 1));
        let result = create_product(&db, too_long).await;
        assert!(matches!(result, Err(Error::InvalidSku { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_manual_sku_cannot_take_generated_format() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let mut new = NewProduct::new("Phone", category.id, test_prices());
        new.sku = Some("ELE-SMA-0001".to_string());
        let result = create_product(&db, new).await;
        assert!(matches!(
            result,
            Err(Error::InvalidSku { ref sku }) if sku == "ELE-SMA-0001"
        ));

        // the generated sequence for the prefix still starts at 0001 and keeps going
        for expected in ["ELE-SMA-0001", "ELE-SMA-0002", "ELE-SMA-0003"] {
            let product = create_test_product(&db, "Smartphone", category.id).await?;
            assert_eq!(product.sku, expected);
        }

        // lowercase or odd-width codes are not generated ones and stay allowed
        let mut new = NewProduct::new("Phone", category.id, test_prices());
        new.sku = Some("ele-sma-0001".to_string());
        create_product(&db, new).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_insert_conflict_names_the_clashing_column() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let mut new = NewProduct::new("Phone", category.id, test_prices());
        new.barcode = Some("4006381333931".to_string());
        let phone = create_product(&db, new).await?;

        // bypass the pre-insert checks to hit the table constraints directly
        let mut same_barcode = product::ActiveModel::from(phone.clone()).reset_all();
        same_barcode.id = sea_orm::ActiveValue::NotSet;
        same_barcode.sku = Set("OTHER-1".to_string());
        let err = same_barcode.insert(&db).await.unwrap_err();
        assert!(matches!(
            insert_conflict(err, "OTHER-1", Some("4006381333931")),
            Error::DuplicateBarcode { .. }
        ));

        let mut same_sku = product::ActiveModel::from(phone.clone()).reset_all();
        same_sku.id = sea_orm::ActiveValue::NotSet;
        same_sku.barcode = Set(Some("5901234123457".to_string()));
        let err = same_sku.insert(&db).await.unwrap_err();
        assert!(matches!(
            insert_conflict(err, &phone.sku, Some("5901234123457")),
            Error::DuplicateSku { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_barcode_must_be_unique() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let mut new = NewProduct::new("Phone", category.id, test_prices());
        new.barcode = Some("4006381333931".to_string());
        let phone = create_product(&db, new).await?;

        let mut clash = NewProduct::new("Tablet", category.id, test_prices());
        clash.barcode = Some(" 4006381333931 ".to_string());
        let result = create_product(&db, clash).await;
        assert!(matches!(result, Err(Error::DuplicateBarcode { .. })));

        // blank barcodes are stored as absent and never clash
        let mut blank = NewProduct::new("Tablet", category.id, test_prices());
        blank.barcode = Some("   ".to_string());
        let tablet = create_product(&db, blank).await?;
        assert!(tablet.barcode.is_none());

        let result = update_product(
            &db,
            tablet.id,
            ProductUpdate {
                barcode: Some(Some("4006381333931".to_string())),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::DuplicateBarcode { .. })));

        // re-saving a product's own barcode is fine
        update_product(
            &db,
            phone.id,
            ProductUpdate {
                barcode: Some(Some("4006381333931".to_string())),
                ..Default::default()
            },
        )
        .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_revalidates_merged_prices() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let product = create_test_product(&db, "Phone", category.id).await?;

        // wholesale below the stored least selling price
        let result = update_product(
            &db,
            product.id,
            ProductUpdate {
                prices: PriceUpdate {
                    wholesale_price: Some(dec!(600)),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::PricingHierarchyViolation {
                lower: PriceField::LeastSellingPrice,
                higher: PriceField::WholesalePrice,
                ..
            })
        ));

        let updated = update_product(
            &db,
            product.id,
            ProductUpdate {
                name: Some("Phone Pro".to_string()),
                prices: PriceUpdate {
                    retail_price: Some(dec!(1099.99)),
                    ..Default::default()
                },
                discount_percent: Some(dec!(10)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.name, "Phone Pro");
        assert_eq!(updated.retail_price, dec!(1099.99));
        assert_eq!(updated.unit_cost, dec!(500));
        // the SKU never follows a rename
        assert_eq!(updated.sku, product.sku);

        let result = update_product(&db, 999, ProductUpdate::default()).await;
        assert!(matches!(result, Err(Error::ProductNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_product_number_is_not_reused() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let first = create_test_product(&db, "Smartphone", category.id).await?;
        let deleted = delete_product(&db, first.id).await?;
        assert_eq!(deleted.sku, "ELE-SMA-0001");
        assert!(get_product_by_id(&db, first.id).await?.is_none());

        let next = create_test_product(&db, "Smartphone", category.id).await?;
        assert_eq!(next.sku, "ELE-SMA-0002");

        let result = delete_product(&db, first.id).await;
        assert!(matches!(result, Err(Error::ProductNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_product_by_sku() -> Result<()> {
        let (db, product) = setup_with_product().await?;

        let found = get_product_by_sku(&db, &product.sku).await?.unwrap();
        assert_eq!(found.id, product.id);
        assert!(get_product_by_sku(&db, "NOP-NOP-0001").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_products_filters() -> Result<()> {
        let (db, electronics) = setup_with_category().await?;
        let books = crate::core::category::create_category(&db, "Books", None).await?;

        let phone = create_test_product(&db, "Smartphone", electronics.id).await?;
        let laptop = create_test_product(&db, "Laptop", electronics.id).await?;
        let novel = create_test_product(&db, "Novel", books.id).await?;
        deactivate_product(&db, laptop.id).await?;

        let all = list_products(&db, &ProductFilter::default()).await?;
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Laptop", "Novel", "Smartphone"]);

        let active_electronics = list_products(
            &db,
            &ProductFilter {
                category_id: Some(electronics.id),
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(active_electronics.len(), 1);
        assert_eq!(active_electronics[0].id, phone.id);

        let by_sku = list_products(
            &db,
            &ProductFilter {
                search: Some("boo-nov".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_sku.len(), 1);
        assert_eq!(by_sku[0].id, novel.id);

        // fresh products hold no stock and sit below the default reorder level
        let low = list_products(
            &db,
            &ProductFilter {
                low_stock_only: true,
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(low.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_derived_values() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let mut new = NewProduct::new(
            "Soda",
            category.id,
            PriceSet::new(dec!(50), dec!(70), dec!(80), dec!(100)),
        );
        new.pack_size = 12;
        new.discount_percent = dec!(10);
        let product = create_product(&db, new).await?;

        assert_eq!(product.profit_margin(), dec!(100));
        assert_eq!(product.discounted_price(), dec!(90));
        assert!(product.is_low_stock());
        assert_eq!(product.available_stock(), 0);
        assert_eq!(product.price_set().retail_price, dec!(100));

        let stocked = product::Model {
            quantity: 20,
            ..product
        };
        assert!(!stocked.is_low_stock());
        assert_eq!(stocked.available_stock(), 240);

        Ok(())
    }
}

//! Shared test utilities for the stockroom catalog.
//!
//! Helpers for setting up in-memory test databases and creating categories and
//! products with sensible defaults.

use crate::{
    core::{
        category,
        pricing::PriceSet,
        product::{self, NewProduct},
    },
    entities::{self, SkuSequence, sku_sequence},
    errors::{Error, Result},
};
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, DatabaseConnection, Set, prelude::*, sea_query::OnConflict};
use tempfile::TempDir;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database behind a pool of `max_connections`,
/// so concurrent tasks run on separate connections. Keep the `TempDir` alive
/// for as long as the database is used.
pub async fn setup_file_db(max_connections: u32) -> Result<(DatabaseConnection, TempDir)> {
    let dir = tempfile::tempdir().map_err(|e| Error::Config {
        message: format!("Failed to create temp dir: {e}"),
    })?;
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("stockroom.sqlite").display()
    );

    let mut options = ConnectOptions::new(url);
    options.max_connections(max_connections).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, dir))
}

/// A valid price set: cost 500, least 699.99, wholesale 799.99, retail 999.99.
#[must_use]
pub fn test_prices() -> PriceSet {
    PriceSet::new(dec!(500.00), dec!(699.99), dec!(799.99), dec!(999.99))
}

/// Creates a test category with no description.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::category::Model> {
    category::create_category(db, name, None).await
}

/// Creates a test product with a generated SKU and [`test_prices`].
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    category_id: i64,
) -> Result<entities::product::Model> {
    product::create_product(db, NewProduct::new(name, category_id, test_prices())).await
}

/// Creates a test product with custom prices.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    category_id: i64,
    prices: PriceSet,
) -> Result<entities::product::Model> {
    product::create_product(db, NewProduct::new(name, category_id, prices)).await
}

/// Sets up a test environment with an "Electronics" category.
/// Returns (db, category).
pub async fn setup_with_category() -> Result<(DatabaseConnection, entities::category::Model)> {
    let db = setup_test_db().await?;
    let category = create_test_category(&db, "Electronics").await?;
    Ok((db, category))
}

/// Sets up a test environment with a "Test Product" in "Electronics".
/// Returns (db, product).
pub async fn setup_with_product() -> Result<(DatabaseConnection, entities::product::Model)> {
    let (db, category) = setup_with_category().await?;
    let product = create_test_product(&db, "Test Product", category.id).await?;
    Ok((db, product))
}

/// Forces the SKU counter for `prefix` to `value`, creating the row if needed.
pub async fn set_counter(db: &DatabaseConnection, prefix: &str, value: i32) -> Result<()> {
    let counter = sku_sequence::ActiveModel {
        prefix: Set(prefix.to_string()),
        last_number: Set(value),
        updated_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    SkuSequence::insert(counter)
        .on_conflict(
            OnConflict::column(sku_sequence::Column::Prefix)
                .update_column(sku_sequence::Column::LastNumber)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

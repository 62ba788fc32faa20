//! Database configuration module for the stockroom catalog.
//!
//! Handles the `SQLite` connection and creates every table from the entity
//! definitions with `SeaORM`'s `Schema::create_table_from_entity`, so the schema
//! always matches the Rust structs.

use crate::entities::{Category, Product, SkuSequence, Stock, StockColumn, StockMovement};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema, sea_query::Index};
use std::path::Path;
use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/stockroom.sqlite?mode=rwc";

/// Gets the database URL from `DATABASE_URL` or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Directory holding a file-backed `SQLite` database, if the URL names one.
fn sqlite_file_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Connects to the database named by [`get_database_url`].
///
/// # Errors
/// Returns an error if the connection cannot be established.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_file_dir(&database_url) {
        std::fs::create_dir_all(dir).map_err(|e| Error::Config {
            message: format!("Failed to create database directory {}: {e}", dir.display()),
        })?;
    }
    debug!(%database_url, "Connecting to database");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables that do not exist yet, parents before children, plus the
/// unique `(product_id, batch_no)` index on stock batches.
///
/// # Errors
/// Returns an error if a `CREATE TABLE` statement fails.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = [
        schema.create_table_from_entity(Category),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Stock),
        schema.create_table_from_entity(StockMovement),
        schema.create_table_from_entity(SkuSequence),
    ];
    for mut statement in statements {
        statement.if_not_exists();
        db.execute(builder.build(&statement)).await?;
    }

    let batch_index = Index::create()
        .name("idx_stocks_product_batch")
        .table(Stock)
        .col(StockColumn::ProductId)
        .col(StockColumn::BatchNo)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&batch_index)).await?;

    Ok(())
}

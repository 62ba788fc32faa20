//! Category business logic - Creating, listing, renaming and removing categories.
//!
//! Category names are unique and feed the first segment of generated SKUs.
//! A category cannot be deleted while any product still points at it.

use crate::{
    config::catalog::CategoryConfig,
    entities::{Category, Product, category, product},
    errors::{Error, Result},
};
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// A category together with the number of active products in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    /// The category row
    pub category: category::Model,
    /// Active products referencing the category
    pub products_count: i64,
}

fn clean_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: "Category name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Creates a category with a unique, trimmed name.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - Another category already uses the name
/// - The database insert fails
#[instrument(skip(db))]
pub async fn create_category(
    db: &DatabaseConnection,
    name: &str,
    description: Option<String>,
) -> Result<category::Model> {
    let name = clean_name(name)?;

    if get_category_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateCategory { name });
    }

    let now = chrono::Utc::now().naive_utc();
    let category = category::ActiveModel {
        name: Set(name),
        description: Set(clean_description(description)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = category.insert(db).await?;
    info!(id = created.id, name = %created.name, "Created category");
    Ok(created)
}

/// Retrieves a category by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_category_by_id<C>(db: &C, category_id: i64) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a category by its exact name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists categories ordered by name, each with its count of active products.
///
/// `search` matches case-insensitively against name and description.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn list_categories(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<CategorySummary>> {
    let mut query = Category::find().order_by_asc(category::Column::Name);
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(category::Column::Name.contains(term))
                .add(category::Column::Description.contains(term)),
        );
    }
    let categories = query.all(db).await?;

    let counts: HashMap<i64, i64> = Product::find()
        .select_only()
        .column(product::Column::CategoryId)
        .column_as(Expr::col(product::Column::Id).count(), "products_count")
        .filter(product::Column::IsActive.eq(true))
        .group_by(product::Column::CategoryId)
        .into_tuple::<(i64, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    Ok(categories
        .into_iter()
        .map(|category| CategorySummary {
            products_count: counts.get(&category.id).copied().unwrap_or(0),
            category,
        })
        .collect())
}

/// Renames a category and replaces its description.
///
/// Existing SKUs keep their prefix; only products created afterwards use the new name.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The category does not exist
/// - Another category already uses the new name
/// - The database update fails
#[instrument(skip(db))]
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    name: &str,
    description: Option<String>,
) -> Result<category::Model> {
    let name = clean_name(name)?;

    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: category_id.to_string(),
        })?;

    if let Some(clash) = get_category_by_name(db, &name).await? {
        if clash.id != category_id {
            return Err(Error::DuplicateCategory { name });
        }
    }

    let mut category: category::ActiveModel = existing.into();
    category.name = Set(name);
    category.description = Set(clean_description(description));
    category.updated_at = Set(chrono::Utc::now().naive_utc());

    category.update(db).await.map_err(Into::into)
}

/// Deletes a category that no product references.
///
/// # Errors
/// Returns an error if:
/// - The category does not exist
/// - Any product (active or not) still belongs to it
/// - The database delete fails
#[instrument(skip(db))]
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let category = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: category_id.to_string(),
        })?;

    let products = Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .count(db)
        .await?;
    if products > 0 {
        return Err(Error::CategoryInUse {
            name: category.name,
            products,
        });
    }

    let name = category.name.clone();
    category.delete(db).await?;
    info!(%name, "Deleted category");
    Ok(())
}

/// Creates every configured category that does not exist yet.
///
/// Returns how many categories were created.
///
/// # Errors
/// Returns an error if a configured name is invalid or a database operation fails.
pub async fn seed_categories(db: &DatabaseConnection, configs: &[CategoryConfig]) -> Result<usize> {
    let mut created = 0;
    for config in configs {
        if get_category_by_name(db, &config.name).await?.is_none() {
            create_category(db, &config.name, config.description.clone()).await?;
            created += 1;
        }
    }
    Ok(created)
}

//! Stock business logic - Batches, stock movements and the product quantity cache.
//!
//! Every change to a batch quantity is written together with a stock movement in one
//! transaction, and batch quantities move with a single `quantity = quantity + delta`
//! update guarded against going negative. After each operation the product's cached
//! `quantity` is recomputed from its active batches.

use crate::{
    core::{
        pricing::{PriceField, check_price},
        product::get_product_by_id,
    },
    entities::{MovementType, Product, Stock, StockMovement, product, stock, stock_movement},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, instrument};

/// Details of incoming stock for [`add_stock`].
#[derive(Clone, Debug, Deserialize)]
pub struct StockReceipt {
    /// Units received, must be positive
    pub quantity: i32,
    /// Cost per unit for this delivery
    pub unit_cost: Decimal,
    /// Batch to add to; a timestamped batch number is generated when absent
    #[serde(default)]
    pub batch_no: Option<String>,
    /// Expiry date of a new batch
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Storage location of a new batch
    #[serde(default)]
    pub location: Option<String>,
    /// Invoice or delivery reference
    #[serde(default)]
    pub reference: String,
    /// Free-form note; a default note names the batch
    #[serde(default)]
    pub note: String,
}

impl StockReceipt {
    /// A receipt for `quantity` units at `unit_cost` with no further details.
    #[must_use]
    pub const fn new(quantity: i32, unit_cost: Decimal) -> Self {
        Self {
            quantity,
            unit_cost,
            batch_no: None,
            expiry_date: None,
            location: None,
            reference: String::new(),
            note: String::new(),
        }
    }
}

/// Details of outgoing stock for [`remove_stock`].
#[derive(Clone, Debug, Deserialize)]
pub struct StockIssue {
    /// Sale, order or transfer reference
    #[serde(default)]
    pub reference: String,
    /// Free-form note; a default note names the batch
    #[serde(default)]
    pub note: String,
    /// Earliest expiry first (`true`) or newest batch first (`false`)
    #[serde(default = "default_fifo")]
    pub use_fifo: bool,
}

const fn default_fifo() -> bool {
    true
}

impl Default for StockIssue {
    fn default() -> Self {
        Self {
            reference: String::new(),
            note: String::new(),
            use_fifo: true,
        }
    }
}

/// Filters for [`list_movements`]. Unset fields do not filter.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct MovementFilter {
    /// Only movements of this product
    pub product_id: Option<i64>,
    /// Only movements of this kind
    pub movement_type: Option<MovementType>,
}

/// Aggregate figures over a set of movements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MovementSummary {
    /// Number of movements
    pub total_movements: usize,
    /// Units received (`IN`)
    pub stock_in_total: i64,
    /// Units issued (`OUT`), as a positive number
    pub stock_out_total: i64,
    /// Net units from adjustments
    pub adjustments_total: i64,
    /// Value of all incoming units
    pub total_value_in: Decimal,
    /// Value of all outgoing units
    pub total_value_out: Decimal,
    /// Net change in units
    pub net_quantity: i64,
    /// `total_value_in - total_value_out`
    pub net_value: Decimal,
}

impl MovementType {
    /// Checks that `quantity` has the sign this kind of movement requires.
    ///
    /// # Errors
    /// Returns [`Error::InvalidQuantity`] for zero, a non-positive `IN` or a non-negative `OUT`.
    pub fn check_quantity(self, quantity: i32) -> Result<()> {
        let ok = match self {
            Self::In => quantity > 0,
            Self::Out => quantity < 0,
            Self::Adjust | Self::Transfer | Self::Return | Self::Damage => quantity != 0,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidQuantity {
                quantity: i64::from(quantity),
            })
        }
    }
}

impl stock::Model {
    /// Past its expiry date on `today`
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Days from `today` until expiry, negative once expired
    #[must_use]
    pub fn days_to_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date
            .map(|expiry| expiry.signed_duration_since(today).num_days())
    }
}

impl stock_movement::Model {
    /// `|quantity| * unit_cost`, when a unit cost was recorded
    #[must_use]
    pub fn total_value(&self) -> Option<Decimal> {
        self.unit_cost
            .map(|cost| Decimal::from(self.quantity.unsigned_abs()) * cost)
    }
}

fn batch_stamp(prefix: &str, now: NaiveDateTime) -> String {
    format!("{prefix}-{}", now.format("%Y%m%d-%H%M%S"))
}

/// Earliest expiry first, undated batches last, then oldest first.
fn fifo_order(a: &stock::Model, b: &stock::Model) -> Ordering {
    let by_expiry = match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

/// Newest batch first.
fn lifo_order(a: &stock::Model, b: &stock::Model) -> Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

async fn require_product<C>(conn: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    get_product_by_id(conn, product_id)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: product_id.to_string(),
        })
}

async fn active_batches<C>(conn: &C, product_id: i64) -> Result<Vec<stock::Model>>
where
    C: ConnectionTrait,
{
    Stock::find()
        .filter(stock::Column::ProductId.eq(product_id))
        .filter(stock::Column::IsActive.eq(true))
        .all(conn)
        .await
        .map_err(Into::into)
}

async fn find_or_create_batch<C>(
    conn: &C,
    product_id: i64,
    batch_no: &str,
    unit_cost: Decimal,
    expiry_date: Option<NaiveDate>,
    location: String,
) -> Result<stock::Model>
where
    C: ConnectionTrait,
{
    // (product_id, batch_no) is unique; a concurrent creator wins silently.
    let now = Utc::now().naive_utc();
    let created = Stock::insert(stock::ActiveModel {
        product_id: Set(product_id),
        batch_no: Set(batch_no.to_string()),
        expiry_date: Set(expiry_date),
        quantity: Set(0),
        unit_cost: Set(unit_cost),
        location: Set(location),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([stock::Column::ProductId, stock::Column::BatchNo])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
    if created > 0 {
        debug!(batch_no, product_id, "Created stock batch");
    }

    let batch = Stock::find()
        .filter(stock::Column::ProductId.eq(product_id))
        .filter(stock::Column::BatchNo.eq(batch_no))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("stock batch {batch_no}")))?;
    Ok(batch)
}

/// Writes a movement and applies it to its batch.
///
/// The batch update is a single guarded `quantity = quantity + delta`, so two
/// concurrent removals can never drive a batch below zero and no batch grows
/// past `i32::MAX`.
#[allow(clippy::too_many_arguments)]
async fn record_movement<C>(
    conn: &C,
    product_id: i64,
    batch: Option<&stock::Model>,
    movement_type: MovementType,
    quantity: i32,
    unit_cost: Option<Decimal>,
    reference: &str,
    note: String,
) -> Result<stock_movement::Model>
where
    C: ConnectionTrait,
{
    movement_type.check_quantity(quantity)?;

    if let Some(batch) = batch {
        let guard = if quantity < 0 {
            stock::Column::Quantity.gte(-quantity)
        } else {
            stock::Column::Quantity.lte(i32::MAX - quantity)
        };
        let applied = Stock::update_many()
            .col_expr(
                stock::Column::Quantity,
                Expr::col(stock::Column::Quantity).add(quantity),
            )
            .col_expr(
                stock::Column::UpdatedAt,
                Expr::value(Utc::now().naive_utc()),
            )
            .filter(stock::Column::Id.eq(batch.id))
            .filter(guard)
            .exec(conn)
            .await?;
        if applied.rows_affected == 0 {
            return Err(if quantity < 0 {
                Error::InsufficientStock {
                    requested: -i64::from(quantity),
                    available: i64::from(batch.quantity),
                }
            } else {
                Error::InvalidQuantity {
                    quantity: i64::from(batch.quantity) + i64::from(quantity),
                }
            });
        }
    }

    let now = Utc::now().naive_utc();
    let movement = stock_movement::ActiveModel {
        product_id: Set(product_id),
        stock_id: Set(batch.map(|b| b.id)),
        movement_type: Set(movement_type),
        quantity: Set(quantity),
        unit_cost: Set(unit_cost),
        reference: Set(reference.to_string()),
        note: Set(note),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    movement.insert(conn).await.map_err(Into::into)
}

fn batch_total(batches: &[stock::Model]) -> i64 {
    batches.iter().map(|batch| i64::from(batch.quantity)).sum()
}

/// Recomputes a product's cached quantity from its active batches and returns it.
///
/// # Errors
/// Returns an error if:
/// - The active batches together hold more than `i32::MAX` units ([`Error::InvalidQuantity`])
/// - A database operation fails
pub async fn refresh_product_quantity<C>(conn: &C, product_id: i64) -> Result<i32>
where
    C: ConnectionTrait,
{
    let sum = batch_total(&active_batches(conn, product_id).await?);
    let total = i32::try_from(sum).map_err(|_| Error::InvalidQuantity { quantity: sum })?;

    Product::update_many()
        .col_expr(product::Column::Quantity, Expr::value(total))
        .col_expr(
            product::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(conn)
        .await?;

    Ok(total)
}

/// Receives stock into a batch, creating the batch on first use.
///
/// # Errors
/// Returns an error if:
/// - The quantity is not positive or the unit cost is not a valid price
/// - The product does not exist
/// - A database operation fails
#[instrument(skip(db, receipt), fields(quantity = receipt.quantity))]
pub async fn add_stock(
    db: &DatabaseConnection,
    product_id: i64,
    receipt: StockReceipt,
) -> Result<stock::Model> {
    if receipt.quantity <= 0 {
        return Err(Error::InvalidQuantity {
            quantity: i64::from(receipt.quantity),
        });
    }
    check_price(PriceField::UnitCost, receipt.unit_cost)?;

    let txn = db.begin().await?;
    let product = require_product(&txn, product_id).await?;

    let batch_no = receipt
        .batch_no
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| batch_stamp("BATCH", Utc::now().naive_utc()));

    let batch = find_or_create_batch(
        &txn,
        product.id,
        &batch_no,
        receipt.unit_cost,
        receipt.expiry_date,
        receipt.location.unwrap_or_default(),
    )
    .await?;

    let note = if receipt.note.is_empty() {
        format!("Stock added - Batch: {batch_no}")
    } else {
        receipt.note
    };
    record_movement(
        &txn,
        product.id,
        Some(&batch),
        MovementType::In,
        receipt.quantity,
        Some(receipt.unit_cost),
        &receipt.reference,
        note,
    )
    .await?;

    let total = refresh_product_quantity(&txn, product.id).await?;
    let batch = Stock::find_by_id(batch.id)
        .one(&txn)
        .await?
        .ok_or(Error::StockNotFound { id: batch.id })?;
    txn.commit().await?;

    info!(sku = %product.sku, %batch_no, total, "Stock added");
    Ok(batch)
}

async fn remove_from_batches<C>(
    conn: &C,
    product: &product::Model,
    quantity: i32,
    issue: &StockIssue,
) -> Result<Vec<stock_movement::Model>>
where
    C: ConnectionTrait,
{
    let mut batches: Vec<_> = active_batches(conn, product.id)
        .await?
        .into_iter()
        .filter(|batch| batch.quantity > 0)
        .collect();
    batches.sort_by(if issue.use_fifo { fifo_order } else { lifo_order });

    let available = batch_total(&batches);
    if available < i64::from(quantity) {
        return Err(Error::InsufficientStock {
            requested: i64::from(quantity),
            available,
        });
    }

    let mut remaining = quantity;
    let mut movements = Vec::new();
    for batch in &batches {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.quantity);
        let note = if issue.note.is_empty() {
            format!("Stock removed - Batch: {}", batch.batch_no)
        } else {
            issue.note.clone()
        };
        let movement = record_movement(
            conn,
            product.id,
            Some(batch),
            MovementType::Out,
            -take,
            Some(batch.unit_cost),
            &issue.reference,
            note,
        )
        .await?;
        movements.push(movement);
        remaining -= take;
    }

    Ok(movements)
}

/// Issues stock from the product's active batches, one `OUT` movement per batch touched.
///
/// Nothing is written when the active batches hold fewer units than requested.
///
/// # Errors
/// Returns an error if:
/// - The quantity is not positive
/// - The product does not exist
/// - Active stock is insufficient
/// - A database operation fails
#[instrument(skip(db, issue))]
pub async fn remove_stock(
    db: &DatabaseConnection,
    product_id: i64,
    quantity: i32,
    issue: StockIssue,
) -> Result<Vec<stock_movement::Model>> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity {
            quantity: i64::from(quantity),
        });
    }

    let txn = db.begin().await?;
    let product = require_product(&txn, product_id).await?;
    let movements = remove_from_batches(&txn, &product, quantity, &issue).await?;
    let total = refresh_product_quantity(&txn, product.id).await?;
    txn.commit().await?;

    info!(sku = %product.sku, quantity, total, "Stock removed");
    Ok(movements)
}

/// Brings the product's active stock to exactly `new_total` units.
///
/// An increase is booked as an `ADJUST` movement on the newest active batch (or a
/// fresh `ADJ-` batch at the product's unit cost). A decrease is a FIFO removal.
/// Returns the movements written, empty when the stock already matches.
///
/// # Errors
/// Returns an error if:
/// - `new_total` is negative
/// - The product does not exist
/// - A database operation fails
#[instrument(skip(db, reference, note))]
pub async fn adjust_stock(
    db: &DatabaseConnection,
    product_id: i64,
    new_total: i32,
    reference: &str,
    note: &str,
) -> Result<Vec<stock_movement::Model>> {
    if new_total < 0 {
        return Err(Error::InvalidQuantity {
            quantity: i64::from(new_total),
        });
    }

    let txn = db.begin().await?;
    let product = require_product(&txn, product_id).await?;
    let batches = active_batches(&txn, product.id).await?;
    let current = batch_total(&batches);
    let difference = i32::try_from(i64::from(new_total) - current)
        .map_err(|_| Error::InvalidQuantity { quantity: current })?;

    let movements = match difference.cmp(&0) {
        Ordering::Equal => Vec::new(),
        Ordering::Greater => {
            let newest = batches.iter().min_by(|a, b| lifo_order(a, b)).cloned();
            let batch = match newest {
                Some(batch) => batch,
                None => {
                    find_or_create_batch(
                        &txn,
                        product.id,
                        &batch_stamp("ADJ", Utc::now().naive_utc()),
                        product.unit_cost,
                        None,
                        String::new(),
                    )
                    .await?
                }
            };
            let note = if note.is_empty() {
                format!("Stock adjustment: {current} → {new_total}")
            } else {
                note.to_string()
            };
            let movement = record_movement(
                &txn,
                product.id,
                Some(&batch),
                MovementType::Adjust,
                difference,
                Some(batch.unit_cost),
                reference,
                note,
            )
            .await?;
            vec![movement]
        }
        Ordering::Less => {
            let issue = StockIssue {
                reference: reference.to_string(),
                note: if note.is_empty() {
                    "Stock adjustment".to_string()
                } else {
                    note.to_string()
                },
                use_fifo: true,
            };
            remove_from_batches(&txn, &product, -difference, &issue).await?
        }
    };

    refresh_product_quantity(&txn, product.id).await?;
    txn.commit().await?;

    info!(sku = %product.sku, from = current, to = new_total, "Stock adjusted");
    Ok(movements)
}

/// Retires a batch; its units stop counting toward the product quantity.
///
/// # Errors
/// Returns an error if the batch does not exist or a database operation fails.
pub async fn deactivate_stock(db: &DatabaseConnection, stock_id: i64) -> Result<stock::Model> {
    let txn = db.begin().await?;

    let mut batch: stock::ActiveModel = Stock::find_by_id(stock_id)
        .one(&txn)
        .await?
        .ok_or(Error::StockNotFound { id: stock_id })?
        .into();
    batch.is_active = Set(false);
    batch.updated_at = Set(Utc::now().naive_utc());
    let batch = batch.update(&txn).await?;

    refresh_product_quantity(&txn, batch.product_id).await?;
    txn.commit().await?;
    Ok(batch)
}

/// Retrieves a batch by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_stock_by_id(db: &DatabaseConnection, stock_id: i64) -> Result<Option<stock::Model>> {
    Stock::find_by_id(stock_id).one(db).await.map_err(Into::into)
}

/// Lists a product's batches, earliest expiry first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_stock(
    db: &DatabaseConnection,
    product_id: i64,
    active_only: bool,
) -> Result<Vec<stock::Model>> {
    let mut query = Stock::find().filter(stock::Column::ProductId.eq(product_id));
    if active_only {
        query = query.filter(stock::Column::IsActive.eq(true));
    }
    let mut batches = query.all(db).await?;
    batches.sort_by(fifo_order);
    Ok(batches)
}

/// Lists movements, newest first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_movements(
    db: &DatabaseConnection,
    filter: MovementFilter,
) -> Result<Vec<stock_movement::Model>> {
    let mut query = StockMovement::find()
        .order_by_desc(stock_movement::Column::CreatedAt)
        .order_by_desc(stock_movement::Column::Id);
    if let Some(product_id) = filter.product_id {
        query = query.filter(stock_movement::Column::ProductId.eq(product_id));
    }
    if let Some(movement_type) = filter.movement_type {
        query = query.filter(stock_movement::Column::MovementType.eq(movement_type));
    }
    query.all(db).await.map_err(Into::into)
}

/// Totals over all movements, or over one product's movements.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn movement_summary(
    db: &DatabaseConnection,
    product_id: Option<i64>,
) -> Result<MovementSummary> {
    let movements = list_movements(
        db,
        MovementFilter {
            product_id,
            movement_type: None,
        },
    )
    .await?;

    let mut summary = MovementSummary {
        total_movements: movements.len(),
        ..Default::default()
    };
    for movement in &movements {
        let quantity = i64::from(movement.quantity);
        let value = movement.total_value().unwrap_or_default();
        match movement.movement_type {
            MovementType::In => summary.stock_in_total += quantity,
            MovementType::Out => summary.stock_out_total += -quantity,
            MovementType::Adjust => summary.adjustments_total += quantity,
            MovementType::Transfer | MovementType::Return | MovementType::Damage => {}
        }
        if quantity > 0 {
            summary.total_value_in += value;
        } else {
            summary.total_value_out += value;
        }
        summary.net_quantity += quantity;
    }
    summary.net_value = summary.total_value_in - summary.total_value_out;

    Ok(summary)
}

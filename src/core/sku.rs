//! SKU allocation - Sequence-based stock keeping unit codes.
//!
//! A SKU looks like `ELE-SMA-0001`: three letters from the category name, three
//! letters from the product name, and a four-digit number that is unique within
//! that `CAT-PRD` prefix.
//!
//! Numbers come from one counter row per prefix in the `sku_sequences` table. The
//! row is bumped with a single `UPDATE ... SET last_number = last_number + 1`, so
//! any number of processes sharing the database can allocate concurrently
//! without handing out the same number twice. The counter only ever grows;
//! deleting a product never frees its number.

use crate::{
    entities::{SkuSequence, sku_sequence},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{debug, info, instrument, warn};

/// Letters taken from each name
pub const PREFIX_LEN: usize = 3;

/// Width of the zero-padded sequence number
pub const SEQUENCE_DIGITS: usize = 4;

/// Highest sequence number a prefix can hand out
pub const MAX_SEQUENCE: i32 = 9999;

const PAD: char = 'X';

/// A well-formed generated SKU (`^[A-Z]{3}-[A-Z]{3}-\d{4}$`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SkuCode(String);

impl SkuCode {
    /// Builds a code from a `CAT-PRD` prefix and a sequence number in `1..=9999`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSku`] when the prefix is malformed or the number is out of range.
    pub fn new(prefix: &str, sequence: i32) -> Result<Self> {
        if !(1..=MAX_SEQUENCE).contains(&sequence) {
            return Err(Error::InvalidSku {
                sku: format!("{prefix}-{sequence}"),
            });
        }
        format!("{prefix}-{sequence:0width$}", width = SEQUENCE_DIGITS).parse()
    }

    /// The full code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `CAT-PRD` part, which is also the counter key
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.0[..2 * PREFIX_LEN + 1]
    }

    /// The numeric part
    #[must_use]
    pub fn sequence(&self) -> i32 {
        self.0[2 * PREFIX_LEN + 2..].parse().unwrap_or_default()
    }
}

impl FromStr for SkuCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 2 * PREFIX_LEN + SEQUENCE_DIGITS + 2
            && bytes.iter().enumerate().all(|(i, b)| match i {
                0..=2 | 4..=6 => b.is_ascii_uppercase(),
                3 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            })
            && &s[2 * PREFIX_LEN + 2..] != "0000";

        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::InvalidSku { sku: s.to_string() })
        }
    }
}

impl TryFrom<String> for SkuCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SkuCode> for String {
    fn from(value: SkuCode) -> Self {
        value.0
    }
}

impl fmt::Display for SkuCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Three-letter code for a name: its first three ASCII letters, uppercased and
/// right-padded with `X`. A name without letters becomes `XXX`.
#[must_use]
pub fn prefix_code(name: &str) -> String {
    let mut code: String = name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(PREFIX_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while code.len() < PREFIX_LEN {
        code.push(PAD);
    }
    code
}

/// Counter key for a category/product pair, e.g. `"ELE-SMA"`.
#[must_use]
pub fn sku_prefix(category_name: &str, product_name: &str) -> String {
    format!(
        "{}-{}",
        prefix_code(category_name),
        prefix_code(product_name)
    )
}

/// Allocates the next SKU for a category/product pair in its own transaction.
///
/// # Errors
/// - [`Error::ExhaustedSequence`] once 9999 codes exist for the prefix
/// - [`Error::Database`] if the counter cannot be read or written
#[instrument(skip(db))]
pub async fn allocate_sku(
    db: &DatabaseConnection,
    category_name: &str,
    product_name: &str,
) -> Result<SkuCode> {
    let txn = db.begin().await?;
    let sku = next_sku(&txn, category_name, product_name).await?;
    txn.commit().await?;

    info!(%sku, "Allocated SKU");
    Ok(sku)
}

/// Allocates the next SKU using an existing connection or transaction.
///
/// Product creation calls this inside its own transaction so the counter bump
/// and the product row commit together. Run against a bare connection the
/// read-back is not isolated from other writers; use [`allocate_sku`] there.
///
/// # Errors
/// Same as [`allocate_sku`].
pub async fn next_sku<C>(conn: &C, category_name: &str, product_name: &str) -> Result<SkuCode>
where
    C: ConnectionTrait,
{
    let prefix = sku_prefix(category_name, product_name);
    let now = Utc::now().naive_utc();

    // Lazily create the counter row; a concurrent creator wins silently.
    let created = SkuSequence::insert(sku_sequence::ActiveModel {
        prefix: Set(prefix.clone()),
        last_number: Set(0),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(sku_sequence::Column::Prefix)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
    if created > 0 {
        debug!(%prefix, "Created SKU sequence counter");
    }

    // Single read-modify-write on the row; the guard refuses to pass 9999.
    let bumped = SkuSequence::update_many()
        .col_expr(
            sku_sequence::Column::LastNumber,
            Expr::col(sku_sequence::Column::LastNumber).add(1),
        )
        .col_expr(sku_sequence::Column::UpdatedAt, Expr::value(now))
        .filter(sku_sequence::Column::Prefix.eq(prefix.as_str()))
        .filter(sku_sequence::Column::LastNumber.lt(MAX_SEQUENCE))
        .exec(conn)
        .await?;

    if bumped.rows_affected == 0 {
        warn!(%prefix, "SKU sequence exhausted");
        return Err(Error::ExhaustedSequence { prefix });
    }

    let counter = find_counter(conn, &prefix)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("sku sequence {prefix}")))?;

    SkuCode::new(&prefix, counter.last_number)
}

/// Returns the SKU the next allocation would produce, without touching the counter.
///
/// # Errors
/// - [`Error::ExhaustedSequence`] when the prefix has no codes left
/// - [`Error::Database`] if the counter cannot be read
pub async fn preview_sku(
    db: &DatabaseConnection,
    category_name: &str,
    product_name: &str,
) -> Result<SkuCode> {
    let prefix = sku_prefix(category_name, product_name);
    let last = find_counter(db, &prefix)
        .await?
        .map_or(0, |counter| counter.last_number);

    if last >= MAX_SEQUENCE {
        return Err(Error::ExhaustedSequence { prefix });
    }
    SkuCode::new(&prefix, last + 1)
}

/// Current counter row for a prefix, if any allocation has happened.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn find_counter<C>(conn: &C, prefix: &str) -> Result<Option<sku_sequence::Model>>
where
    C: ConnectionTrait,
{
    SkuSequence::find()
        .filter(sku_sequence::Column::Prefix.eq(prefix))
        .one(conn)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use tokio::task::JoinSet;

    fn looks_like_sku(s: &str) -> bool {
        s.parse::<SkuCode>().is_ok()
    }

    #[test]
    fn test_prefix_code() {
        assert_eq!(prefix_code("Electronics"), "ELE");
        assert_eq!(prefix_code("Smartphone"), "SMA");
        assert_eq!(prefix_code("Ab"), "ABX");
        assert_eq!(prefix_code("X"), "XXX");
        assert_eq!(prefix_code(""), "XXX");
        assert_eq!(prefix_code("1234"), "XXX");
        assert_eq!(prefix_code("Food & Beverage"), "FOO");
        assert_eq!(prefix_code("T-Shirt"), "TSH");
        assert_eq!(prefix_code("4K tv"), "KTV");
        assert_eq!(prefix_code("Écran"), "CRA");
    }

    #[test]
    fn test_sku_prefix() {
        assert_eq!(sku_prefix("Electronics", "Smartphone"), "ELE-SMA");
        assert_eq!(sku_prefix("Ab", "X"), "ABX-XXX");
    }

    #[test]
    fn test_sku_code_parsing() {
        let sku: SkuCode = "ELE-SMA-0042".parse().unwrap();
        assert_eq!(sku.prefix(), "ELE-SMA");
        assert_eq!(sku.sequence(), 42);
        assert_eq!(sku.to_string(), "ELE-SMA-0042");

        assert!(!looks_like_sku("ele-sma-0001"));
        assert!(!looks_like_sku("ELE-SMA-001"));
        assert!(!looks_like_sku("ELE-SMA-00001"));
        assert!(!looks_like_sku("ELESMA-00001"));
        assert!(!looks_like_sku("EL1-SMA-0001"));
        assert!(!looks_like_sku("ELE-SMA-0000"));
        assert!(!looks_like_sku("MANUAL-SKU-001"));
    }

    #[test]
    fn test_sku_code_new_bounds() {
        assert_eq!(SkuCode::new("ABX-XXX", 1).unwrap().as_str(), "ABX-XXX-0001");
        assert_eq!(SkuCode::new("ABX-XXX", 9999).unwrap().as_str(), "ABX-XXX-9999");
        assert!(SkuCode::new("ABX-XXX", 0).is_err());
        assert!(SkuCode::new("ABX-XXX", 10_000).is_err());
        assert!(SkuCode::new("ABXX-XXX", 1).is_err());
    }

    #[tokio::test]
    async fn test_first_allocations_for_pair() -> Result<()> {
        let db = setup_test_db().await?;

        let first = allocate_sku(&db, "Electronics", "Smartphone").await?;
        let second = allocate_sku(&db, "Electronics", "Smartphone").await?;
        assert_eq!(first.as_str(), "ELE-SMA-0001");
        assert_eq!(second.as_str(), "ELE-SMA-0002");

        let padded = allocate_sku(&db, "Ab", "X").await?;
        assert_eq!(padded.as_str(), "ABX-XXX-0001");

        Ok(())
    }

    #[tokio::test]
    async fn test_prefixes_count_independently() -> Result<()> {
        let db = setup_test_db().await?;

        allocate_sku(&db, "Electronics", "Smartphone").await?;
        allocate_sku(&db, "Electronics", "Smartphone").await?;
        let other = allocate_sku(&db, "Electronics", "Laptop").await?;
        assert_eq!(other.as_str(), "ELE-LAP-0001");

        // names that collapse to the same prefix share a counter
        let shared = allocate_sku(&db, "Electric", "Smart Watch").await?;
        assert_eq!(shared.as_str(), "ELE-SMA-0003");

        Ok(())
    }

    #[tokio::test]
    async fn test_sequential_allocations_are_gapless() -> Result<()> {
        let db = setup_test_db().await?;

        let mut numbers = Vec::new();
        for _ in 0..25 {
            let sku = allocate_sku(&db, "Test", "Product").await?;
            assert!(looks_like_sku(sku.as_str()));
            numbers.push(sku.sequence());
        }
        assert_eq!(numbers, (1..=25).collect::<Vec<_>>());

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_are_unique() -> Result<()> {
        let db = setup_test_db().await?;

        let mut tasks = JoinSet::new();
        for _ in 0..40 {
            let db = db.clone();
            tasks.spawn(async move { allocate_sku(&db, "Groceries", "Milk").await });
        }

        let mut numbers = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let sku = joined.unwrap()?;
            assert_eq!(sku.prefix(), "GRO-MIL");
            numbers.push(sku.sequence());
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=40).collect::<Vec<_>>());

        let counter = find_counter(&db, "GRO-MIL").await?.unwrap();
        assert_eq!(counter.last_number, 40);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_allocations_across_connections() -> Result<()> {
        let (db, _dir) = setup_file_db(8).await?;

        let mut tasks = JoinSet::new();
        for _ in 0..80 {
            let db = db.clone();
            tasks.spawn(async move { allocate_sku(&db, "Groceries", "Milk").await });
        }

        let mut numbers = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            numbers.push(joined.unwrap()?.sequence());
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=80).collect::<Vec<_>>());

        let counter = find_counter(&db, "GRO-MIL").await?.unwrap();
        assert_eq!(counter.last_number, 80);

        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_sequence() -> Result<()> {
        let db = setup_test_db().await?;
        set_counter(&db, "ELE-SMA", MAX_SEQUENCE - 1).await?;

        let last = allocate_sku(&db, "Electronics", "Smartphone").await?;
        assert_eq!(last.as_str(), "ELE-SMA-9999");

        let result = allocate_sku(&db, "Electronics", "Smartphone").await;
        assert!(matches!(
            result,
            Err(Error::ExhaustedSequence { ref prefix }) if prefix == "ELE-SMA"
        ));

        // the failed attempt did not move the counter
        let counter = find_counter(&db, "ELE-SMA").await?.unwrap();
        assert_eq!(counter.last_number, MAX_SEQUENCE);

        // other prefixes are unaffected
        assert_eq!(
            allocate_sku(&db, "Electronics", "Tablet").await?.as_str(),
            "ELE-TAB-0001"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_preview_does_not_consume() -> Result<()> {
        let db = setup_test_db().await?;

        let preview = preview_sku(&db, "Electronics", "Test Product").await?;
        assert_eq!(preview.as_str(), "ELE-TES-0001");
        assert_eq!(
            preview_sku(&db, "Electronics", "Test Product").await?,
            preview
        );
        assert!(find_counter(&db, "ELE-TES").await?.is_none());

        let allocated = allocate_sku(&db, "Electronics", "Test Product").await?;
        assert_eq!(allocated, preview);
        assert_eq!(
            preview_sku(&db, "Electronics", "Test Product").await?.as_str(),
            "ELE-TES-0002"
        );

        set_counter(&db, "ELE-TES", MAX_SEQUENCE).await?;
        assert!(matches!(
            preview_sku(&db, "Electronics", "Test Product").await,
            Err(Error::ExhaustedSequence { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_sku_code_serializes_as_plain_string() {
        let sku: SkuCode = "BOO-RUS-0001".parse().unwrap();
        let value = toml::Value::try_from(&sku).unwrap();
        assert_eq!(value.as_str(), Some("BOO-RUS-0001"));
    }
}

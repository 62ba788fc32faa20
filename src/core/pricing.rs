//! Pricing rules - validation of the four-tier price hierarchy and derived prices.
//!
//! Everything in this module is pure: no I/O, no shared state, and identical
//! inputs always give identical results. Request handlers can call
//! [`validate_pricing`] for a pre-submission preview without touching the database.
//!
//! Prices use [`Decimal`] with at most two fractional digits. Input carrying more
//! precision is rejected instead of being rounded.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Fractional digits allowed on any stored price
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Largest storable price, 99 999 999.99 (10 digits, 2 after the point)
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// One of the four price points of a product, in hierarchy order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Cost price per unit
    UnitCost,
    /// Lowest price a sale may be made at
    LeastSellingPrice,
    /// Bulk price
    WholesalePrice,
    /// Shelf price
    RetailPrice,
}

impl PriceField {
    /// Field name as it appears in requests and error messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnitCost => "unit_cost",
            Self::LeastSellingPrice => "least_selling_price",
            Self::WholesalePrice => "wholesale_price",
            Self::RetailPrice => "retail_price",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four price points of a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSet {
    /// Cost price per unit
    pub unit_cost: Decimal,
    /// Lowest price a sale may be made at
    pub least_selling_price: Decimal,
    /// Bulk price
    pub wholesale_price: Decimal,
    /// Shelf price
    pub retail_price: Decimal,
}

/// A partial change to a [`PriceSet`]; `None` keeps the stored value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// New cost price
    pub unit_cost: Option<Decimal>,
    /// New least selling price
    pub least_selling_price: Option<Decimal>,
    /// New wholesale price
    pub wholesale_price: Option<Decimal>,
    /// New retail price
    pub retail_price: Option<Decimal>,
}

impl PriceUpdate {
    /// True when no price is being changed
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.unit_cost.is_none()
            && self.least_selling_price.is_none()
            && self.wholesale_price.is_none()
            && self.retail_price.is_none()
    }
}

impl PriceSet {
    /// Builds a price set in hierarchy order.
    #[must_use]
    pub const fn new(
        unit_cost: Decimal,
        least_selling_price: Decimal,
        wholesale_price: Decimal,
        retail_price: Decimal,
    ) -> Self {
        Self {
            unit_cost,
            least_selling_price,
            wholesale_price,
            retail_price,
        }
    }

    /// Checks this set against the pricing hierarchy.
    ///
    /// # Errors
    /// See [`validate_pricing`].
    pub fn validate(&self) -> Result<()> {
        validate_pricing(
            self.unit_cost,
            self.least_selling_price,
            self.wholesale_price,
            self.retail_price,
        )
    }

    /// Overlays a partial update on this set. The result is not validated.
    #[must_use]
    pub fn merge(&self, update: &PriceUpdate) -> Self {
        Self {
            unit_cost: update.unit_cost.unwrap_or(self.unit_cost),
            least_selling_price: update
                .least_selling_price
                .unwrap_or(self.least_selling_price),
            wholesale_price: update.wholesale_price.unwrap_or(self.wholesale_price),
            retail_price: update.retail_price.unwrap_or(self.retail_price),
        }
    }

    fn tiers(&self) -> [(PriceField, Decimal); 4] {
        [
            (PriceField::UnitCost, self.unit_cost),
            (PriceField::LeastSellingPrice, self.least_selling_price),
            (PriceField::WholesalePrice, self.wholesale_price),
            (PriceField::RetailPrice, self.retail_price),
        ]
    }
}

/// Validates a candidate set of prices.
///
/// Checks run in a fixed order and the first failure is returned:
/// 1. every value is a valid price (see [`check_price`]),
/// 2. `unit_cost <= least_selling_price`,
/// 3. `least_selling_price <= wholesale_price`,
/// 4. `wholesale_price <= retail_price`.
///
/// Adjacent tiers may be equal.
///
/// # Errors
/// - [`Error::InvalidPrice`] for a negative, over-precise or oversized value
/// - [`Error::PricingHierarchyViolation`] naming the first out-of-order pair
pub fn validate_pricing(
    unit_cost: Decimal,
    least_selling_price: Decimal,
    wholesale_price: Decimal,
    retail_price: Decimal,
) -> Result<()> {
    let tiers = PriceSet::new(unit_cost, least_selling_price, wholesale_price, retail_price).tiers();

    for (field, value) in tiers {
        check_price(field, value)?;
    }

    for pair in tiers.windows(2) {
        let (lower, lower_value) = pair[0];
        let (higher, higher_value) = pair[1];
        if lower_value > higher_value {
            return Err(Error::PricingHierarchyViolation {
                lower,
                higher,
                lower_value,
                higher_value,
            });
        }
    }

    Ok(())
}

/// Checks a single price: non-negative, at most two fractional digits, at most [`MAX_PRICE`].
///
/// # Errors
/// Returns [`Error::InvalidPrice`] naming `field`.
pub fn check_price(field: PriceField, value: Decimal) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::InvalidPrice {
            field,
            reason: format!("must be non-negative, got {value}"),
        });
    }
    if value.normalize().scale() > PRICE_DECIMAL_PLACES {
        return Err(Error::InvalidPrice {
            field,
            reason: format!("at most {PRICE_DECIMAL_PLACES} decimal places allowed, got {value}"),
        });
    }
    if value > MAX_PRICE {
        return Err(Error::InvalidPrice {
            field,
            reason: format!("exceeds maximum allowed ({MAX_PRICE}), got {value}"),
        });
    }
    Ok(())
}

/// Parses user-supplied text into a price for `field`.
///
/// # Errors
/// Returns [`Error::InvalidPrice`] when the text is not a decimal number or the
/// number fails [`check_price`].
pub fn parse_price(field: PriceField, input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    let value = Decimal::from_str(trimmed).map_err(|e| Error::InvalidPrice {
        field,
        reason: format!("{trimmed:?} is not a decimal number: {e}"),
    })?;
    check_price(field, value)?;
    Ok(value)
}

/// Checks a discount percentage: `0 <= percent <= 100`, two fractional digits at most.
///
/// # Errors
/// Returns [`Error::InvalidDiscount`].
pub fn validate_discount(percent: Decimal) -> Result<()> {
    if percent < Decimal::ZERO
        || percent > HUNDRED
        || percent.normalize().scale() > PRICE_DECIMAL_PLACES
    {
        return Err(Error::InvalidDiscount { percent });
    }
    Ok(())
}

/// Retail price after the discount, rounded to cents (banker's rounding).
#[must_use]
pub fn discounted_price(retail_price: Decimal, discount_percent: Decimal) -> Decimal {
    (retail_price * (Decimal::ONE - discount_percent / HUNDRED))
        .round_dp_with_strategy(PRICE_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// Markup on cost in percent: `(retail - cost) / cost * 100`, zero when cost is zero.
#[must_use]
pub fn profit_margin(unit_cost: Decimal, retail_price: Decimal) -> Decimal {
    if unit_cost > Decimal::ZERO {
        (retail_price - unit_cost) / unit_cost * HUNDRED
    } else {
        Decimal::ZERO
    }
}

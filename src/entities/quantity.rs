//! Exact stock quantities.
//!
//! Quantities are persisted as signed integers counting ten-thousandths of a
//! unit, so every backend stores and adds them without rounding. At most four
//! fractional digits are accepted.

use rust_decimal::Decimal;
use sea_orm::sea_query::{ArrayType, ColumnType, Nullable, ValueType, ValueTypeErr};
use sea_orm::{ColIdx, QueryResult, TryGetError, TryGetable, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional digits kept by every stored quantity.
pub const QUANTITY_SCALE: u32 = 4;

/// Largest magnitude a single movement may carry: `999999999999.9999`.
const MAX_MOVEMENT_UNITS: i64 = 9_999_999_999_999_999;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity {0} has more than 4 decimal places")]
    TooPrecise(Decimal),
    #[error("quantity {0} is outside the supported range")]
    OutOfRange(Decimal),
}

/// A decimal quantity with at most [`QUANTITY_SCALE`] fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "Decimal", try_from = "Decimal")]
pub struct Quantity {
    units: i64,
}

impl Quantity {
    pub const ZERO: Quantity = Quantity { units: 0 };

    /// Exact conversion. Fails on extra precision or when the value does not
    /// fit the storage column.
    pub fn new(value: Decimal) -> Result<Self, QuantityError> {
        let normalized = value.normalize();
        if normalized.scale() > QUANTITY_SCALE {
            return Err(QuantityError::TooPrecise(value));
        }
        let mut scaled = normalized;
        scaled.rescale(QUANTITY_SCALE);
        <i64 as TryFrom<i128>>::try_from(scaled.mantissa())
            .map(Self::from_units)
            .map_err(|_| QuantityError::OutOfRange(value))
    }

    /// Like [`Quantity::new`], additionally bounded to what one ledger entry
    /// may move.
    pub fn for_movement(value: Decimal) -> Result<Self, QuantityError> {
        let quantity = Self::new(value)?;
        if quantity.units.unsigned_abs() > MAX_MOVEMENT_UNITS.unsigned_abs() {
            return Err(QuantityError::OutOfRange(value));
        }
        Ok(quantity)
    }

    pub const fn from_units(units: i64) -> Self {
        Self { units }
    }

    /// Stored representation, in ten-thousandths.
    pub const fn units(&self) -> i64 {
        self.units
    }

    pub fn amount(&self) -> Decimal {
        Decimal::new(self.units, QUANTITY_SCALE).normalize()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.amount(), f)
    }
}

impl From<Quantity> for Decimal {
    fn from(quantity: Quantity) -> Self {
        quantity.amount()
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = QuantityError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl PartialEq<Decimal> for Quantity {
    fn eq(&self, other: &Decimal) -> bool {
        self.amount() == *other
    }
}

impl From<Quantity> for Value {
    fn from(quantity: Quantity) -> Self {
        Value::BigInt(Some(quantity.units))
    }
}

impl TryGetable for Quantity {
    fn try_get_by<I: ColIdx>(res: &QueryResult, idx: I) -> Result<Self, TryGetError> {
        <i64 as TryGetable>::try_get_by(res, idx).map(Quantity::from_units)
    }
}

impl ValueType for Quantity {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        <i64 as ValueType>::try_from(v).map(Quantity::from_units)
    }

    fn type_name() -> String {
        "Quantity".to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::BigInt
    }

    fn column_type() -> ColumnType {
        ColumnType::BigInteger
    }
}

impl Nullable for Quantity {
    fn null() -> Value {
        Value::BigInt(None)
    }
}

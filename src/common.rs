/// Common types and utilities shared across handlers and services
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::entities::quantity::{Quantity, QuantityError};
use crate::errors::ServiceError;

/// Rejects quantities the ledger cannot store exactly.
pub fn validate_quantity_precision(value: &Decimal) -> Result<(), ValidationError> {
    Quantity::for_movement(*value).map(|_| ()).map_err(|e| {
        let code = match e {
            QuantityError::TooPrecise(_) => "scale",
            QuantityError::OutOfRange(_) => "range",
        };
        let mut err = ValidationError::new(code);
        err.message = Some(e.to_string().into());
        err
    })
}

pub fn validate_positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        validate_quantity_precision(value)
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Quantity must be greater than 0".into());
        Err(err)
    }
}

pub fn validate_non_zero_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_zero() {
        let mut err = ValidationError::new("non_zero");
        err.message = Some("Quantity must not be zero".into());
        Err(err)
    } else {
        validate_quantity_precision(value)
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("Must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Which end of a date range a bare `YYYY-MM-DD` value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Start,
    End,
}

/// Parses an RFC3339 timestamp, or a plain date expanded to the start or end
/// of that day (UTC).
pub fn parse_range_bound(raw: &str, bound: RangeBound) -> Result<DateTime<Utc>, ServiceError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ServiceError::InvalidInput(format!(
            "Invalid date '{}': expected YYYY-MM-DD or an RFC3339 timestamp",
            raw
        ))
    })?;

    let datetime = match bound {
        RangeBound::Start => date.and_hms_opt(0, 0, 0),
        RangeBound::End => date.and_hms_micro_opt(23, 59, 59, 999_999),
    }
    .ok_or_else(|| ServiceError::InvalidInput(format!("Invalid date '{}'", raw)))?;

    Ok(Utc.from_utc_datetime(&datetime))
}

//! Sign rules for ledger entries.
//!
//! Each entry point states its intent; the intent alone decides the stored
//! sign. Generic creation infers the sign from the movement type, while the
//! receiving, transfer and adjustment workflows carry their own direction.

use crate::entities::{quantity::Quantity, stock_movement::MovementType};
use crate::errors::ServiceError;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementIntent {
    /// Goods arriving through the receiving workflow.
    Receipt { quantity: Decimal },
    /// Debit leg of a transfer, at the source location.
    TransferOut { quantity: Decimal },
    /// Credit leg of a transfer, at the destination location.
    TransferIn { quantity: Decimal },
    /// Correction stored with the caller's sign untouched.
    Adjustment { quantity: Decimal },
    /// `POST /stock-movements`: sign inferred from the type.
    Generic {
        movement_type: MovementType,
        quantity: Decimal,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMovement {
    pub movement_type: MovementType,
    /// Signed: positive adds stock, negative removes it.
    pub quantity: Quantity,
}

/// +1 for types that add stock, -1 for those that remove it.
pub fn implied_sign(movement_type: MovementType) -> Decimal {
    match movement_type {
        MovementType::Receipt | MovementType::Return => Decimal::ONE,
        MovementType::Sale | MovementType::Transfer | MovementType::Adjustment => {
            Decimal::NEGATIVE_ONE
        }
    }
}

impl MovementIntent {
    pub fn movement_type(&self) -> MovementType {
        match self {
            MovementIntent::Receipt { .. } => MovementType::Receipt,
            MovementIntent::TransferOut { .. } | MovementIntent::TransferIn { .. } => {
                MovementType::Transfer
            }
            MovementIntent::Adjustment { .. } => MovementType::Adjustment,
            MovementIntent::Generic { movement_type, .. } => *movement_type,
        }
    }

    fn raw_quantity(&self) -> Decimal {
        match *self {
            MovementIntent::Receipt { quantity }
            | MovementIntent::TransferOut { quantity }
            | MovementIntent::TransferIn { quantity }
            | MovementIntent::Adjustment { quantity }
            | MovementIntent::Generic { quantity, .. } => quantity,
        }
    }

    /// Resolves the stored type and signed quantity. Zero is always rejected,
    /// as is anything the quantity column cannot hold exactly.
    pub fn resolve(self) -> Result<ResolvedMovement, ServiceError> {
        let quantity = self.raw_quantity();
        if quantity.is_zero() {
            return Err(ServiceError::ValidationError(
                "quantity must be non-zero".to_string(),
            ));
        }

        let signed = match self {
            MovementIntent::Receipt { .. }
            | MovementIntent::TransferOut { .. }
            | MovementIntent::TransferIn { .. }
                if quantity.is_sign_negative() =>
            {
                return Err(ServiceError::ValidationError(format!(
                    "{} quantity must be positive",
                    self.movement_type().as_str()
                )));
            }
            MovementIntent::Receipt { .. } | MovementIntent::TransferIn { .. } => quantity,
            MovementIntent::TransferOut { .. } => -quantity,
            MovementIntent::Adjustment { .. } => quantity,
            MovementIntent::Generic { movement_type, .. } => {
                quantity.abs() * implied_sign(movement_type)
            }
        };

        Ok(ResolvedMovement {
            movement_type: self.movement_type(),
            quantity: Quantity::for_movement(signed)?,
        })
    }
}

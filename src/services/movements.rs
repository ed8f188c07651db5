use crate::{
    common::validate_non_zero_decimal,
    db::{with_transaction, DbPool},
    entities::stock_movement::{self, MovementType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::{require_location, require_lot_for_product, require_product},
        ledger::{self, NewMovement, StockLevel},
        movement_policy::MovementIntent,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// `POST /stock-movements`. The stored sign is inferred from `type`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_adjustment_reason"))]
pub struct CreateMovementRequest {
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    #[validate(custom = "validate_non_zero_decimal")]
    #[schema(value_type = String, example = "2")]
    pub quantity: Decimal,
    pub location_id: Option<Uuid>,
    pub lot_id: Uuid,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

fn validate_adjustment_reason(request: &CreateMovementRequest) -> Result<(), ValidationError> {
    let has_reason = request
        .reason
        .as_deref()
        .map(|r| !r.trim().is_empty())
        .unwrap_or(false);
    if request.movement_type == MovementType::Adjustment && !has_reason {
        let mut err = ValidationError::new("reason_required");
        err.message = Some("reason is required for ADJUSTMENT movements".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StockAvailableParams {
    pub product_id: Uuid,
    pub location_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAvailability {
    pub product_id: Uuid,
    pub location_id: Uuid,
    #[schema(value_type = String, example = "70")]
    pub available: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StockLevelParams {
    pub product_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct MovementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MovementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Generic single-entry creation. Leaves the product cache untouched.
    #[instrument(skip(self, request), fields(
        product_id = %request.product_id,
        movement_type = request.movement_type.as_str(),
    ))]
    pub async fn create(
        &self,
        request: CreateMovementRequest,
    ) -> Result<stock_movement::Model, ServiceError> {
        request.validate()?;
        if request.movement_type == MovementType::Transfer {
            warn!("Generic TRANSFER writes a single unpaired leg; use the transfer endpoint");
        }
        let started = Instant::now();

        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                require_product(txn, request.product_id).await?;
                if let Some(location_id) = request.location_id {
                    require_location(txn, location_id, "Movement").await?;
                }
                require_lot_for_product(txn, request.lot_id, request.product_id).await?;

                ledger::append(
                    txn,
                    NewMovement {
                        product_id: request.product_id,
                        location_id: request.location_id,
                        lot_id: Some(request.lot_id),
                        reference: request.reference,
                        reason: request
                            .reason
                            .map(|r| r.trim().to_string())
                            .filter(|r| !r.is_empty()),
                        intent: MovementIntent::Generic {
                            movement_type: request.movement_type,
                            quantity: request.quantity,
                        },
                    },
                )
                .await
            })
        })
        .await;

        crate::metrics::record_workflow("create_movement", started.elapsed(), &result);

        match &result {
            Ok(movement) => {
                info!(movement_id = %movement.id, quantity = %movement.quantity, "Movement recorded");
                self.event_sender.publish(Event::MovementRecorded {
                    movement_id: movement.id,
                    product_id: movement.product_id,
                    movement_type: movement.movement_type,
                    quantity: movement.quantity.amount(),
                    location_id: movement.location_id,
                    created_at: movement.created_at,
                });
            }
            Err(e) => warn!(error = %e, "Movement rejected"),
        }

        result
    }

    /// Ledger sum for one product at one location.
    pub async fn available(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> Result<StockAvailability, ServiceError> {
        let available =
            ledger::available_stock(self.db_pool.as_ref(), product_id, location_id).await?;
        Ok(StockAvailability {
            product_id,
            location_id,
            available,
        })
    }

    pub async fn stock_levels(
        &self,
        location_ids: &[Uuid],
        product_id: Option<Uuid>,
    ) -> Result<Vec<StockLevel>, ServiceError> {
        ledger::stock_levels(self.db_pool.as_ref(), location_ids, product_id).await
    }
}

use crate::{
    common::{validate_non_zero_decimal, validate_not_blank},
    db::{with_transaction, DbPool},
    entities::stock_movement,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::{require_location, require_lot_for_product, require_product},
        ledger::{self, NewMovement},
        movement_policy::MovementIntent,
    },
};
use rust_decimal::Decimal;
use sea_orm::DatabaseTransaction;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    /// Signed: positive adds stock, negative removes it.
    #[validate(custom = "validate_non_zero_decimal")]
    #[schema(value_type = String, example = "-10")]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    pub reason: String,
    pub lot_id: Uuid,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockResult {
    pub movement: stock_movement::Model,
    #[schema(value_type = String)]
    pub cached_stock: Decimal,
    pub message: String,
}

#[derive(Clone)]
pub struct AdjustmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AdjustmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a signed correction at `location_id` and applies the same
    /// delta to the product's cached stock.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = %request.quantity))]
    pub async fn adjust(
        &self,
        location_id: Uuid,
        request: AdjustStockRequest,
    ) -> Result<AdjustStockResult, ServiceError> {
        request.validate()?;
        let started = Instant::now();

        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move { adjust_in_txn(txn, location_id, request).await })
        })
        .await;

        crate::metrics::record_workflow("adjust", started.elapsed(), &result);

        match &result {
            Ok(outcome) => {
                let movement = &outcome.movement;
                info!(
                    movement_id = %movement.id,
                    cached_stock = %outcome.cached_stock,
                    "Stock adjusted"
                );
                if let Some(lot_id) = movement.lot_id {
                    self.event_sender.publish(Event::StockAdjusted {
                        product_id: movement.product_id,
                        location_id,
                        lot_id,
                        quantity: movement.quantity.amount(),
                        reason: movement.reason.clone().unwrap_or_default(),
                    });
                }
            }
            Err(e) => warn!(error = %e, "Stock adjustment rejected"),
        }

        result
    }
}

async fn adjust_in_txn(
    txn: &DatabaseTransaction,
    location_id: Uuid,
    request: AdjustStockRequest,
) -> Result<AdjustStockResult, ServiceError> {
    require_product(txn, request.product_id).await?;
    require_location(txn, location_id, "Adjustment").await?;
    require_lot_for_product(txn, request.lot_id, request.product_id).await?;

    let movement = ledger::append(
        txn,
        NewMovement {
            product_id: request.product_id,
            location_id: Some(location_id),
            lot_id: Some(request.lot_id),
            reference: request.reference,
            reason: Some(request.reason.trim().to_string()),
            intent: MovementIntent::Adjustment {
                quantity: request.quantity,
            },
        },
    )
    .await?;

    ledger::increment_cached_stock(txn, request.product_id, movement.quantity).await?;
    let cached_stock = require_product(txn, request.product_id)
        .await?
        .stock_quantity
        .amount();

    let message = format!("Adjusted stock by {}", movement.quantity);
    Ok(AdjustStockResult {
        movement,
        cached_stock,
        message,
    })
}

use crate::{
    common::validate_positive_decimal,
    db::{supports_row_locks, with_transaction, DbPool},
    entities::{location, stock_movement},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::{require_location, require_lot_for_product, require_product},
        ledger::{self, generate_code, NewMovement, TRANSFER_REFERENCE_PREFIX},
        movement_policy::MovementIntent,
    },
};
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_distinct_locations"))]
pub struct TransferStockRequest {
    pub product_id: Uuid,
    #[validate(custom = "validate_positive_decimal")]
    #[schema(value_type = String, example = "30")]
    pub quantity: Decimal,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub lot_id: Uuid,
    /// Shared by both legs. Generated as `TRANS-XXXXXXXX` when absent.
    #[validate(length(max = 128))]
    pub reference: Option<String>,
}

fn validate_distinct_locations(request: &TransferStockRequest) -> Result<(), ValidationError> {
    if request.from_location_id == request.to_location_id {
        let mut err = ValidationError::new("same_location");
        err.message = Some("fromLocationId and toLocationId must differ".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferStockResult {
    pub outbound: stock_movement::Model,
    pub inbound: stock_movement::Model,
    pub reference: String,
    pub message: String,
}

#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl TransferService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Moves stock between two locations as a linked debit/credit pair.
    /// The product cache is left alone; the net effect across locations is zero.
    #[instrument(skip(self, request), fields(
        product_id = %request.product_id,
        from = %request.from_location_id,
        to = %request.to_location_id,
        quantity = %request.quantity,
    ))]
    pub async fn transfer(
        &self,
        request: TransferStockRequest,
    ) -> Result<TransferStockResult, ServiceError> {
        request.validate()?;
        let started = Instant::now();

        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move { transfer_in_txn(txn, request).await })
        })
        .await;

        crate::metrics::record_workflow("transfer", started.elapsed(), &result);

        match &result {
            Ok(outcome) => {
                crate::metrics::record_transfer_volume(outcome.inbound.quantity.amount());
                info!(reference = %outcome.reference, "Stock transferred");
                if let (Some(from), Some(to)) =
                    (outcome.outbound.location_id, outcome.inbound.location_id)
                {
                    self.event_sender.publish(Event::StockTransferred {
                        product_id: outcome.inbound.product_id,
                        from_location_id: from,
                        to_location_id: to,
                        quantity: outcome.inbound.quantity.amount(),
                        reference: outcome.reference.clone(),
                    });
                }
            }
            Err(e) => warn!(error = %e, "Stock transfer rejected"),
        }

        result
    }
}

async fn transfer_in_txn(
    txn: &DatabaseTransaction,
    request: TransferStockRequest,
) -> Result<TransferStockResult, ServiceError> {
    require_product(txn, request.product_id).await?;
    lock_source_location(txn, request.from_location_id).await?;
    require_location(txn, request.to_location_id, "Destination").await?;
    require_lot_for_product(txn, request.lot_id, request.product_id).await?;

    let available =
        ledger::available_stock(txn, request.product_id, request.from_location_id).await?;
    if request.quantity > available {
        return Err(ServiceError::InsufficientStock {
            product_id: request.product_id,
            location_id: request.from_location_id,
            available,
            requested: request.quantity,
        });
    }

    let reference = request
        .reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| generate_code(TRANSFER_REFERENCE_PREFIX));

    let outbound = ledger::append(
        txn,
        NewMovement {
            product_id: request.product_id,
            location_id: Some(request.from_location_id),
            lot_id: Some(request.lot_id),
            reference: Some(reference.clone()),
            reason: None,
            intent: MovementIntent::TransferOut {
                quantity: request.quantity,
            },
        },
    )
    .await?;

    let inbound = ledger::append(
        txn,
        NewMovement {
            product_id: request.product_id,
            location_id: Some(request.to_location_id),
            lot_id: Some(request.lot_id),
            reference: Some(reference.clone()),
            reason: None,
            intent: MovementIntent::TransferIn {
                quantity: request.quantity,
            },
        },
    )
    .await?;

    let message = format!(
        "Transferred {} from {} to {}",
        request.quantity, request.from_location_id, request.to_location_id
    );
    Ok(TransferStockResult {
        outbound,
        inbound,
        reference,
        message,
    })
}

/// Loads the source location, holding a row lock on backends that have them
/// so concurrent transfers out of one location check stock one at a time.
async fn lock_source_location(
    txn: &DatabaseTransaction,
    location_id: Uuid,
) -> Result<location::Model, ServiceError> {
    if !supports_row_locks(txn.get_database_backend()) {
        return require_location(txn, location_id, "Source").await;
    }

    debug!(%location_id, "Locking source location");
    location::Entity::find_by_id(location_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Source location {}", location_id)))
}

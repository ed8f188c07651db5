use crate::{
    common::validate_positive_decimal,
    db::{with_transaction, DbPool},
    entities::{lot, product, stock_movement},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::require_location,
        ledger::{self, generate_code, NewMovement, RECEIPT_LOT_PREFIX},
        movement_policy::MovementIntent,
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveItem {
    pub product_id: Uuid,
    #[validate(custom = "validate_positive_decimal")]
    #[schema(value_type = String, example = "100")]
    pub quantity: Decimal,
    /// Generated as `RCV-XXXXXXXX` when absent.
    #[validate(length(min = 1, max = 64))]
    pub lot_code: Option<String>,
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveInventoryRequest {
    #[validate(length(min = 1))]
    #[validate]
    pub items: Vec<ReceiveItem>,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Falls back to the `X-Location-Id` header.
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveInventoryResult {
    pub movements: Vec<stock_movement::Model>,
    pub lots: Vec<lot::Model>,
    pub message: String,
}

#[derive(Clone)]
pub struct ReceivingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ReceivingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records one RECEIPT per item and bumps each product's cached stock.
    /// The whole batch commits or none of it does.
    #[instrument(skip(self, request), fields(items = request.items.len(), location_id = ?request.location_id))]
    pub async fn receive(
        &self,
        request: ReceiveInventoryRequest,
    ) -> Result<ReceiveInventoryResult, ServiceError> {
        request.validate()?;
        let started = Instant::now();
        let location_id = request.location_id;
        let reference = request.reference.clone();

        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move { receive_in_txn(txn, request).await })
        })
        .await;

        crate::metrics::record_workflow("receive", started.elapsed(), &result);

        match &result {
            Ok(outcome) => {
                let total: Decimal = outcome.movements.iter().map(|m| m.quantity.amount()).sum();
                info!(
                    movements = outcome.movements.len(),
                    total_quantity = %total,
                    reference = ?reference,
                    "Inventory received"
                );
                self.event_sender.publish(Event::StockReceived {
                    product_ids: outcome.movements.iter().map(|m| m.product_id).collect(),
                    movement_ids: outcome.movements.iter().map(|m| m.id).collect(),
                    total_quantity: total,
                    location_id,
                    reference,
                });
            }
            Err(e) => warn!(error = %e, "Inventory receipt rejected"),
        }

        result
    }
}

async fn receive_in_txn(
    txn: &DatabaseTransaction,
    request: ReceiveInventoryRequest,
) -> Result<ReceiveInventoryResult, ServiceError> {
    ensure_products_exist(txn, &request.items).await?;
    if let Some(location_id) = request.location_id {
        require_location(txn, location_id, "Receiving").await?;
    }

    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let mut movements = Vec::with_capacity(request.items.len());
    let mut lots = Vec::with_capacity(request.items.len());

    for item in request.items {
        let lot = resolve_lot(txn, &item).await?;

        let movement = ledger::append(
            txn,
            NewMovement {
                product_id: item.product_id,
                location_id: request.location_id,
                lot_id: Some(lot.id),
                reference: request.reference.clone(),
                reason: notes.clone(),
                intent: MovementIntent::Receipt {
                    quantity: item.quantity,
                },
            },
        )
        .await?;

        ledger::increment_cached_stock(txn, item.product_id, movement.quantity).await?;

        movements.push(movement);
        lots.push(lot);
    }

    let message = format!("Received {} item(s)", movements.len());
    Ok(ReceiveInventoryResult {
        movements,
        lots,
        message,
    })
}

/// Fails the batch listing every unknown product id, in request order.
async fn ensure_products_exist<C>(db: &C, items: &[ReceiveItem]) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let mut requested = Vec::new();
    let mut seen = HashSet::new();
    for item in items {
        if seen.insert(item.product_id) {
            requested.push(item.product_id);
        }
    }

    let found: HashSet<Uuid> = product::Entity::find()
        .select_only()
        .column(product::Column::Id)
        .filter(product::Column::Id.is_in(requested.clone()))
        .into_tuple::<Uuid>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let missing: Vec<Uuid> = requested
        .into_iter()
        .filter(|id| !found.contains(id))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::MissingProducts(missing))
    }
}

/// Finds the lot by `(product, code)` or creates it. An existing lot takes a
/// newly supplied expiry.
async fn resolve_lot<C>(db: &C, item: &ReceiveItem) -> Result<lot::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let code = item
        .lot_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| generate_code(RECEIPT_LOT_PREFIX));

    let existing = lot::Entity::find()
        .filter(lot::Column::ProductId.eq(item.product_id))
        .filter(lot::Column::LotCode.eq(code.as_str()))
        .one(db)
        .await?;

    match existing {
        Some(found) => match item.expires_on {
            Some(expires_on) if found.expires_on != Some(expires_on) => {
                let mut active: lot::ActiveModel = found.into();
                active.expires_on = Set(Some(expires_on));
                Ok(active.update(db).await?)
            }
            _ => Ok(found),
        },
        None => Ok(lot::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(item.product_id),
            lot_code: Set(code),
            expires_on: Set(item.expires_on),
            ..Default::default()
        }
        .insert(db)
        .await?),
    }
}

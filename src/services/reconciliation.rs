use crate::{
    db::{supports_row_locks, with_transaction, DbPool},
    entities::{product, quantity::Quantity},
    errors::ServiceError,
    services::ledger,
};
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReconcileParams {
    /// Report drift without writing.
    #[serde(default)]
    pub dry_run: bool,
}

/// A product whose cached stock disagrees with its ledger total.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockDrift {
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(value_type = String)]
    pub cached_stock: Decimal,
    #[schema(value_type = String)]
    pub ledger_stock: Decimal,
    /// `ledger_stock - cached_stock`
    #[schema(value_type = String)]
    pub difference: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub dry_run: bool,
    pub products_checked: usize,
    pub drifted: Vec<StockDrift>,
}

#[derive(Clone)]
pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
}

impl ReconciliationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Sets every product's cached stock to the sum of its movements across
    /// all locations.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, dry_run: bool) -> Result<ReconciliationReport, ServiceError> {
        let started = Instant::now();

        let result = with_transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let products = load_products_for_update(txn).await?;
                let totals = ledger::totals_by_product(txn).await?;

                let products_checked = products.len();
                let drifted: Vec<StockDrift> = products
                    .into_iter()
                    .filter_map(|p| {
                        let ledger_stock = totals.get(&p.id).copied().unwrap_or_default();
                        let cached_stock = p.stock_quantity.amount();
                        (ledger_stock != cached_stock).then(|| StockDrift {
                            product_id: p.id,
                            product_name: p.name,
                            cached_stock,
                            ledger_stock,
                            difference: ledger_stock - cached_stock,
                        })
                    })
                    .collect();

                if !dry_run {
                    apply_drift(txn, &drifted).await?;
                }

                Ok(ReconciliationReport {
                    dry_run,
                    products_checked,
                    drifted,
                })
            })
        })
        .await;

        crate::metrics::record_workflow("reconcile", started.elapsed(), &result);

        match &result {
            Ok(report) if report.drifted.is_empty() => {
                info!(products = report.products_checked, "Stock cache matches ledger")
            }
            Ok(report) => warn!(
                products = report.products_checked,
                drifted = report.drifted.len(),
                dry_run,
                "Stock cache drift found"
            ),
            Err(e) => warn!(error = %e, "Reconciliation failed"),
        }

        result
    }
}

/// All products, row-locked until commit where the backend supports it.
/// Receiving and adjustments wait on these locks before touching the cache.
async fn load_products_for_update<C>(db: &C) -> Result<Vec<product::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut query = product::Entity::find().order_by_asc(product::Column::Name);
    if supports_row_locks(db.get_database_backend()) {
        debug!("Locking product rows for reconciliation");
        query = query.lock_exclusive();
    }
    Ok(query.all(db).await?)
}

/// Shifts each cached figure by its drift instead of overwriting it, so
/// increments committed since the drift was measured are kept.
async fn apply_drift<C>(db: &C, drifted: &[StockDrift]) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    for drift in drifted {
        ledger::increment_cached_stock(db, drift.product_id, Quantity::new(drift.difference)?)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::entities::stock_movement::MovementType;
    use crate::services::{ledger::NewMovement, movement_policy::MovementIntent};
    use rust_decimal_macros::dec;

    async fn receipt(db: &DbPool, product_id: Uuid, quantity: Decimal) {
        let entry = ledger::append(
            db,
            NewMovement {
                product_id,
                location_id: None,
                lot_id: None,
                reference: None,
                reason: None,
                intent: MovementIntent::Generic {
                    movement_type: MovementType::Receipt,
                    quantity,
                },
            },
        )
        .await
        .unwrap();
        ledger::increment_cached_stock(db, product_id, entry.quantity)
            .await
            .unwrap();
    }

    async fn cached(db: &DbPool, product_id: Uuid) -> Quantity {
        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }

    #[tokio::test]
    async fn repair_keeps_increments_made_after_measuring() {
        let db = memory_pool().await;
        let product_id = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Oat milk".into()),
            sku: Set(None),
            stock_quantity: Set(Quantity::new(dec!(4)).unwrap()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap()
        .id;
        ledger::append(
            &db,
            NewMovement {
                product_id,
                location_id: None,
                lot_id: None,
                reference: None,
                reason: None,
                intent: MovementIntent::Receipt { quantity: dec!(10) },
            },
        )
        .await
        .unwrap();

        let service = ReconciliationService::new(Arc::new(db.clone()));
        let report = service.reconcile(true).await.unwrap();
        assert_eq!(report.drifted.len(), 1);
        assert_eq!(report.drifted[0].difference, dec!(6));

        // A receipt lands between measuring and repairing.
        receipt(&db, product_id, dec!(5)).await;
        assert_eq!(cached(&db, product_id).await, dec!(9));

        apply_drift(&db, &report.drifted).await.unwrap();
        assert_eq!(cached(&db, product_id).await, dec!(15));
        assert_eq!(ledger::totals_by_product(&db).await.unwrap()[&product_id], dec!(15));
    }

    #[tokio::test]
    async fn dry_run_reports_without_writing() {
        let db = memory_pool().await;
        let product_id = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Espresso beans".into()),
            sku: Set(None),
            stock_quantity: Set(Quantity::new(dec!(2.5)).unwrap()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap()
        .id;

        let service = ReconciliationService::new(Arc::new(db.clone()));
        let report = service.reconcile(true).await.unwrap();
        assert_eq!(report.drifted[0].ledger_stock, Decimal::ZERO);
        assert_eq!(cached(&db, product_id).await, dec!(2.5));

        let report = service.reconcile(false).await.unwrap();
        assert!(!report.dry_run);
        assert_eq!(cached(&db, product_id).await, Decimal::ZERO);
    }
}

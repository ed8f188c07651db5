//! Movement record store and stock aggregation.
//!
//! Every write goes through [`append`]; stock figures are always folded from
//! the stored entries, never read from the product cache.

use crate::{
    entities::{
        location, product,
        quantity::Quantity,
        stock_movement::{self, Entity as StockMovement},
    },
    errors::ServiceError,
    services::movement_policy::MovementIntent,
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{sea_query::Expr, *};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

pub const RECEIPT_LOT_PREFIX: &str = "RCV";
pub const TRANSFER_REFERENCE_PREFIX: &str = "TRANS";

/// `<PREFIX>-` followed by eight random uppercase alphanumerics.
pub fn generate_code(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}-{}", prefix, suffix)
}

/// Everything needed to write one ledger entry.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub location_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub reference: Option<String>,
    pub reason: Option<String>,
    pub intent: MovementIntent,
}

/// Appends one entry. The stored sign comes from the intent.
pub async fn append<C>(db: &C, movement: NewMovement) -> Result<stock_movement::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let resolved = movement.intent.resolve()?;

    let model = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(movement.product_id),
        quantity: Set(resolved.quantity),
        movement_type: Set(resolved.movement_type),
        location_id: Set(movement.location_id),
        lot_id: Set(movement.lot_id),
        reference: Set(movement.reference),
        reason: Set(movement.reason),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(
        movement_id = %model.id,
        product_id = %model.product_id,
        movement_type = model.movement_type.as_str(),
        quantity = %model.quantity,
        "Ledger entry appended"
    );
    crate::metrics::record_movement(model.movement_type);
    Ok(model)
}

/// Sum of all entries for `(product, location)`. Zero when there are none.
pub async fn available_stock<C>(
    db: &C,
    product_id: Uuid,
    location_id: Uuid,
) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    let quantities: Vec<Quantity> = StockMovement::find()
        .select_only()
        .column(stock_movement::Column::Quantity)
        .filter(stock_movement::Column::ProductId.eq(product_id))
        .filter(stock_movement::Column::LocationId.eq(location_id))
        .into_tuple()
        .all(db)
        .await?;

    Ok(quantities.iter().map(Quantity::amount).sum())
}

/// Ledger totals for every product that has at least one entry, including
/// entries without a location.
pub async fn totals_by_product<C>(db: &C) -> Result<HashMap<Uuid, Decimal>, ServiceError>
where
    C: ConnectionTrait,
{
    let rows: Vec<(Uuid, Quantity)> = StockMovement::find()
        .select_only()
        .column(stock_movement::Column::ProductId)
        .column(stock_movement::Column::Quantity)
        .into_tuple()
        .all(db)
        .await?;

    let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
    for (product_id, quantity) in rows {
        *totals.entry(product_id).or_default() += quantity.amount();
    }
    Ok(totals)
}

/// Adds `delta` to the product's cached stock in a single UPDATE.
pub async fn increment_cached_stock<C>(
    db: &C,
    product_id: Uuid,
    delta: Quantity,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).add(delta.units()),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!("Product {}", product_id)));
    }
    Ok(())
}

/// One row of the per-product, per-location stock report.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    #[schema(value_type = String, example = "42")]
    pub quantity: Decimal,
}

/// Ledger sums grouped by product and location.
///
/// An empty `location_ids` reports every location, including entries with no
/// location. Otherwise only the listed locations are included.
pub async fn stock_levels<C>(
    db: &C,
    location_ids: &[Uuid],
    product_id: Option<Uuid>,
) -> Result<Vec<StockLevel>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut query = StockMovement::find()
        .select_only()
        .column(stock_movement::Column::ProductId)
        .column(stock_movement::Column::LocationId)
        .column(stock_movement::Column::Quantity);
    if !location_ids.is_empty() {
        query = query.filter(stock_movement::Column::LocationId.is_in(location_ids.to_vec()));
    }
    if let Some(product_id) = product_id {
        query = query.filter(stock_movement::Column::ProductId.eq(product_id));
    }

    let rows: Vec<(Uuid, Option<Uuid>, Quantity)> = query.into_tuple().all(db).await?;

    let mut grouped: BTreeMap<(Uuid, Option<Uuid>), Decimal> = BTreeMap::new();
    for (product_id, location_id, quantity) in rows {
        *grouped.entry((product_id, location_id)).or_default() += quantity.amount();
    }

    let product_ids: HashSet<Uuid> = grouped.keys().map(|(p, _)| *p).collect();
    let location_ids: HashSet<Uuid> = grouped.keys().filter_map(|(_, l)| *l).collect();

    let products: HashMap<Uuid, product::Model> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };
    let locations: HashMap<Uuid, location::Model> = if location_ids.is_empty() {
        HashMap::new()
    } else {
        location::Entity::find()
            .filter(location::Column::Id.is_in(location_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect()
    };

    Ok(grouped
        .into_iter()
        .map(|((product_id, location_id), quantity)| {
            let product = products.get(&product_id);
            StockLevel {
                product_id,
                product_name: product.map(|p| p.name.clone()),
                sku: product.and_then(|p| p.sku.clone()),
                location_id,
                location_name: location_id
                    .and_then(|id| locations.get(&id))
                    .map(|l| l.name.clone()),
                quantity,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::entities::stock_movement::MovementType;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn seed_product(db: &DatabaseConnection, name: &str) -> Uuid {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            sku: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    async fn seed_location(db: &DatabaseConnection, name: &str) -> Uuid {
        location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            code: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    fn qty(value: Decimal) -> Quantity {
        Quantity::new(value).unwrap()
    }

    fn generic(product_id: Uuid, location_id: Uuid, t: MovementType, q: Decimal) -> NewMovement {
        NewMovement {
            product_id,
            location_id: Some(location_id),
            lot_id: None,
            reference: None,
            reason: None,
            intent: MovementIntent::Generic {
                movement_type: t,
                quantity: q,
            },
        }
    }

    #[test]
    fn generated_codes_have_prefix_and_uppercase_suffix() {
        let code = generate_code(TRANSFER_REFERENCE_PREFIX);
        let suffix = code.strip_prefix("TRANS-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(generate_code("RCV"), generate_code("RCV"));
    }

    #[tokio::test]
    async fn empty_ledger_reports_zero() {
        let db = memory_pool().await;
        let stock = available_stock(&db, Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        assert_eq!(stock, Decimal::ZERO);
    }

    #[tokio::test]
    async fn aggregate_equals_sum_of_matching_entries() {
        let db = memory_pool().await;
        let product = seed_product(&db, "Cold brew").await;
        let front = seed_location(&db, "Front").await;
        let back = seed_location(&db, "Back").await;

        append(&db, generic(product, front, MovementType::Receipt, dec!(10))).await.unwrap();
        append(&db, generic(product, front, MovementType::Sale, dec!(3))).await.unwrap();
        append(&db, generic(product, front, MovementType::Return, dec!(1.5))).await.unwrap();
        append(&db, generic(product, back, MovementType::Receipt, dec!(4))).await.unwrap();

        assert_eq!(available_stock(&db, product, front).await.unwrap(), dec!(8.5));
        assert_eq!(available_stock(&db, product, back).await.unwrap(), dec!(4));
        let totals = totals_by_product(&db).await.unwrap();
        assert_eq!(totals[&product], dec!(12.5));

        let levels = stock_levels(&db, &[back], None).await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].location_name.as_deref(), Some("Back"));
        assert_eq!(levels[0].product_name.as_deref(), Some("Cold brew"));
        assert_eq!(levels[0].quantity, dec!(4));
    }

    #[tokio::test]
    async fn zero_quantity_never_reaches_the_table() {
        let db = memory_pool().await;
        let product = seed_product(&db, "Bagel").await;
        let front = seed_location(&db, "Front").await;

        let result = append(&db, generic(product, front, MovementType::Sale, Decimal::ZERO)).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
        assert_eq!(StockMovement::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn movements_cannot_be_edited() {
        let db = memory_pool().await;
        let product = seed_product(&db, "Muffin").await;
        let front = seed_location(&db, "Front").await;
        let entry = append(&db, generic(product, front, MovementType::Receipt, dec!(2)))
            .await
            .unwrap();

        let mut active: stock_movement::ActiveModel = entry.into();
        active.quantity = Set(Quantity::from_units(2_000_000));
        assert!(active.update(&db).await.is_err());
    }

    #[tokio::test]
    async fn cached_stock_increment_is_relative() {
        let db = memory_pool().await;
        let product = seed_product(&db, "Tea").await;

        increment_cached_stock(&db, product, qty(dec!(7))).await.unwrap();
        increment_cached_stock(&db, product, qty(dec!(-2))).await.unwrap();

        let model = product::Entity::find_by_id(product).one(&db).await.unwrap().unwrap();
        assert_eq!(model.stock_quantity, dec!(5));

        assert_matches!(
            increment_cached_stock(&db, Uuid::new_v4(), qty(dec!(1))).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn fractional_quantities_add_up_exactly() {
        let db = memory_pool().await;
        let product = seed_product(&db, "Flour").await;
        let front = seed_location(&db, "Front").await;

        for q in [dec!(0.1), dec!(0.2), dec!(999999999999.9999)] {
            let entry = append(&db, generic(product, front, MovementType::Receipt, q))
                .await
                .unwrap();
            increment_cached_stock(&db, product, entry.quantity).await.unwrap();
        }

        let exact = dec!(1000000000000.2999);
        assert_eq!(available_stock(&db, product, front).await.unwrap(), exact);
        let model = product::Entity::find_by_id(product).one(&db).await.unwrap().unwrap();
        assert_eq!(model.stock_quantity, exact);
    }

    #[tokio::test]
    async fn sub_ten_thousandth_entries_are_refused() {
        let db = memory_pool().await;
        let product = seed_product(&db, "Saffron").await;
        let front = seed_location(&db, "Front").await;

        let result = append(&db, generic(product, front, MovementType::Receipt, dec!(0.00001))).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
        assert_eq!(StockMovement::find().count(&db).await.unwrap(), 0);
    }
}

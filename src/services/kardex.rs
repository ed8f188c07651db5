//! Read-only, filterable movement history enriched with product, location
//! and lot details.

use crate::{
    common::{parse_range_bound, RangeBound},
    db::DbPool,
    entities::{
        location, lot, product,
        stock_movement::{self, MovementType},
    },
    errors::ServiceError,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Query-string filters. Dates are `YYYY-MM-DD` or RFC3339; both ends inclusive.
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct KardexParams {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub from: Option<String>,
    /// A plain date covers the whole day.
    pub to: Option<String>,
    /// RECEIPT, SALE, TRANSFER, ADJUSTMENT or RETURN
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    /// Rows to return, newest first. Defaults to the configured page size and
    /// is capped at the configured maximum; the `x-total-count` response
    /// header carries the number of matching rows.
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
}

/// Parsed form of [`KardexParams`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KardexFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub movement_type: Option<MovementType>,
    pub limit: Option<u64>,
}

impl TryFrom<KardexParams> for KardexFilter {
    type Error = ServiceError;

    fn try_from(params: KardexParams) -> Result<Self, Self::Error> {
        let from = params
            .from
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_range_bound(s, RangeBound::Start))
            .transpose()?;
        let to = params
            .to
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_range_bound(s, RangeBound::End))
            .transpose()?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ServiceError::InvalidInput(
                    "'from' must not be after 'to'".to_string(),
                ));
            }
        }

        let movement_type = params
            .movement_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|raw| {
                MovementType::parse(raw).ok_or_else(|| {
                    ServiceError::InvalidInput(format!("Unknown movement type '{}'", raw))
                })
            })
            .transpose()?;

        Ok(KardexFilter {
            product_id: params.product_id,
            location_id: params.location_id,
            from,
            to,
            movement_type,
            limit: params.limit,
        })
    }
}

/// One enriched ledger row. Joined fields are null when the reference is absent.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KardexEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    #[schema(value_type = String, example = "-30")]
    pub quantity: Decimal,
    pub reference: Option<String>,
    pub reason: Option<String>,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub lot_id: Option<Uuid>,
    pub lot_code: Option<String>,
    pub expires_on: Option<NaiveDate>,
}

/// A bounded slice of the history and the size of the full match.
#[derive(Debug, Clone, PartialEq)]
pub struct KardexPage {
    pub entries: Vec<KardexEntry>,
    pub total: u64,
}

impl KardexPage {
    pub fn is_truncated(&self) -> bool {
        (self.entries.len() as u64) < self.total
    }
}

#[derive(Clone)]
pub struct KardexService {
    db_pool: Arc<DbPool>,
    default_limit: u64,
    max_limit: u64,
}

impl KardexService {
    pub fn new(db_pool: Arc<DbPool>, default_limit: u64, max_limit: u64) -> Self {
        Self {
            db_pool,
            default_limit,
            max_limit,
        }
    }

    /// Applies the configured default and cap to a caller-supplied limit.
    pub fn resolve_limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }

    /// Newest first, at most [`KardexService::resolve_limit`] rows.
    pub async fn query(&self, filter: KardexFilter) -> Result<KardexPage, ServiceError> {
        let db = self.db_pool.as_ref();
        let limit = self.resolve_limit(filter.limit);

        let mut query = stock_movement::Entity::find();
        if let Some(product_id) = filter.product_id {
            query = query.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(location_id) = filter.location_id {
            query = query.filter(stock_movement::Column::LocationId.eq(location_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(stock_movement::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(stock_movement::Column::CreatedAt.lte(to));
        }
        if let Some(movement_type) = filter.movement_type {
            query = query.filter(stock_movement::Column::MovementType.eq(movement_type));
        }

        let total = query.clone().count(db).await?;
        let movements = query
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .limit(limit)
            .all(db)
            .await?;
        debug!(rows = movements.len(), total, limit, "Kardex movements loaded");

        Ok(KardexPage {
            entries: enrich(db, movements).await?,
            total,
        })
    }
}

/// Batch-loads the referenced products, locations and lots.
async fn enrich<C>(
    db: &C,
    movements: Vec<stock_movement::Model>,
) -> Result<Vec<KardexEntry>, ServiceError>
where
    C: ConnectionTrait,
{
    let product_ids: HashSet<Uuid> = movements.iter().map(|m| m.product_id).collect();
    let location_ids: HashSet<Uuid> = movements.iter().filter_map(|m| m.location_id).collect();
    let lot_ids: HashSet<Uuid> = movements.iter().filter_map(|m| m.lot_id).collect();

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
    let lots: HashMap<Uuid, lot::Model> = if lot_ids.is_empty() {
        HashMap::new()
    } else {
        lot::Entity::find()
            .filter(lot::Column::Id.is_in(lot_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect()
    };

    Ok(movements
        .into_iter()
        .map(|m| {
            let product = products.get(&m.product_id);
            let location = m.location_id.and_then(|id| locations.get(&id));
            let lot = m.lot_id.and_then(|id| lots.get(&id));
            KardexEntry {
                id: m.id,
                created_at: m.created_at,
                movement_type: m.movement_type,
                quantity: m.quantity.amount(),
                reference: m.reference,
                reason: m.reason,
                product_id: m.product_id,
                product_name: product.map(|p| p.name.clone()),
                sku: product.and_then(|p| p.sku.clone()),
                location_id: m.location_id,
                location_name: location.map(|l| l.name.clone()),
                lot_id: m.lot_id,
                lot_code: lot.map(|l| l.lot_code.clone()),
                expires_on: lot.and_then(|l| l.expires_on),
            }
        })
        .collect())
}

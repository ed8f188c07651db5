use crate::{
    common::validate_not_blank,
    db::DbPool,
    entities::{location, lot, product},
    errors::ServiceError,
};
use sea_orm::*;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 64))]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 255), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 64))]
    pub code: Option<String>,
}

/// Minimal product/location/lot lookups backing the ledger.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// New products start with a cached stock of zero.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            sku: Set(request.sku),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await?;

        info!(product_id = %model.id, "Product created");
        Ok(model)
    }

    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(product::Entity::find()
            .order_by_asc(product::Column::Name)
            .all(self.db_pool.as_ref())
            .await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {}", id)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_location(
        &self,
        request: CreateLocationRequest,
    ) -> Result<location::Model, ServiceError> {
        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            code: Set(request.code),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await?;

        info!(location_id = %model.id, "Location created");
        Ok(model)
    }

    pub async fn list_locations(&self) -> Result<Vec<location::Model>, ServiceError> {
        Ok(location::Entity::find()
            .order_by_asc(location::Column::Name)
            .all(self.db_pool.as_ref())
            .await?)
    }

    pub async fn list_lots(&self, product_id: Option<Uuid>) -> Result<Vec<lot::Model>, ServiceError> {
        let mut query = lot::Entity::find();
        if let Some(product_id) = product_id {
            query = query.filter(lot::Column::ProductId.eq(product_id));
        }
        Ok(query
            .order_by_asc(lot::Column::LotCode)
            .all(self.db_pool.as_ref())
            .await?)
    }
}

/// Fails with `NotFound` naming the location when it does not exist.
pub async fn require_location<C>(db: &C, location_id: Uuid, role: &str) -> Result<location::Model, ServiceError>
where
    C: ConnectionTrait,
{
    location::Entity::find_by_id(location_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} location {}", role, location_id)))
}

pub async fn require_product<C>(db: &C, product_id: Uuid) -> Result<product::Model, ServiceError>
where
    C: ConnectionTrait,
{
    product::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {}", product_id)))
}

/// The lot must exist and belong to `product_id`.
pub async fn require_lot_for_product<C>(
    db: &C,
    lot_id: Uuid,
    product_id: Uuid,
) -> Result<lot::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let lot = lot::Entity::find_by_id(lot_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Lot {}", lot_id)))?;

    if lot.product_id != product_id {
        return Err(ServiceError::InvalidOperation(format!(
            "Lot {} does not belong to product {}",
            lot_id, product_id
        )));
    }
    Ok(lot)
}

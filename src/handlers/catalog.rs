use crate::{
    entities::{location, lot, product},
    errors::{ErrorResponse, ServiceError},
    handlers::AppState,
    middleware_helpers::extractors::{ValidatedJson, ValidatedQuery},
    services::catalog::{CreateLocationRequest, CreateProductRequest},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LotFilter {
    pub product_id: Option<Uuid>,
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product))
        .route("/locations", get(list_locations).post(create_location))
        .route("/lots", get(list_lots))
}

/// Create a product; its cached stock starts at zero
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = product::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List products with their cached stock
#[utoipa::path(
    get,
    path = "/products",
    responses((status = 200, description = "Products", body = [product::Model])),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<product::Model>>, ServiceError> {
    Ok(Json(state.services.catalog.list_products().await?))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = product::Model),
        (status = 404, description = "Unknown product", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<product::Model>, ServiceError> {
    Ok(Json(state.services.catalog.get_product(id).await?))
}

#[utoipa::path(
    post,
    path = "/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Location created", body = location::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_location(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state.services.catalog.create_location(request).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[utoipa::path(
    get,
    path = "/locations",
    responses((status = 200, description = "Locations", body = [location::Model])),
    tag = "catalog"
)]
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<location::Model>>, ServiceError> {
    Ok(Json(state.services.catalog.list_locations().await?))
}

#[utoipa::path(
    get,
    path = "/lots",
    params(LotFilter),
    responses((status = 200, description = "Lots", body = [lot::Model])),
    tag = "catalog"
)]
pub async fn list_lots(
    State(state): State<AppState>,
    ValidatedQuery(filter): ValidatedQuery<LotFilter>,
) -> Result<Json<Vec<lot::Model>>, ServiceError> {
    Ok(Json(state.services.catalog.list_lots(filter.product_id).await?))
}

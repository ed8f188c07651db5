use crate::{
    entities::stock_movement,
    errors::{ErrorResponse, ServiceError},
    handlers::AppState,
    middleware_helpers::extractors::{ValidatedJson, ValidatedQuery},
    services::{
        kardex::{KardexEntry, KardexFilter, KardexPage, KardexParams},
        movements::CreateMovementRequest,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

pub fn stock_movement_routes() -> Router<AppState> {
    Router::new().route("/stock-movements", get(list_movements).post(create_movement))
}

/// Record one movement; the stored sign follows the movement type
#[utoipa::path(
    post,
    path = "/stock-movements",
    request_body = CreateMovementRequest,
    responses(
        (status = 201, description = "Movement recorded", body = stock_movement::Model),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Unknown product, location or lot", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn create_movement(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement = state.services.movements.create(request).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Filtered movement listing with joined product, location and lot
#[utoipa::path(
    get,
    path = "/stock-movements",
    params(KardexParams),
    responses(
        (
            status = 200,
            description = "Movements, newest first, at most `limit` of them",
            body = [KardexEntry],
            headers(("x-total-count" = u64, description = "Rows matching the filter before the limit"))
        ),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<KardexParams>,
) -> Result<KardexPage, ServiceError> {
    let filter = KardexFilter::try_from(params)?;
    state.services.kardex.query(filter).await
}

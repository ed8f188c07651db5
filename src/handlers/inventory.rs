use crate::{
    errors::{ErrorResponse, ServiceError},
    handlers::AppState,
    middleware_helpers::extractors::{
        LocationHeader, LocationIdsHeader, OptionalLocationHeader, ValidatedJson, ValidatedQuery,
    },
    services::{
        adjustments::{AdjustStockRequest, AdjustStockResult},
        kardex::{KardexEntry, KardexFilter, KardexPage, KardexParams},
        ledger::StockLevel,
        movements::{StockAvailability, StockAvailableParams, StockLevelParams},
        receiving::{ReceiveInventoryRequest, ReceiveInventoryResult},
        reconciliation::{ReconcileParams, ReconciliationReport},
        transfers::{TransferStockRequest, TransferStockResult},
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

/// Admin ledger routes plus the kiosk-facing receive/lookup routes.
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/inventory/adjust", post(adjust_stock))
        .route("/admin/inventory/transfer", post(transfer_stock))
        .route("/admin/inventory/kardex", get(kardex))
        .route("/admin/inventory/stock", get(stock_levels))
        .route("/admin/inventory/reconcile", post(reconcile_stock_cache))
        .route("/inventory/receive", post(receive_inventory))
        .route("/inventory/stock-available", get(stock_available))
}

/// Record a signed stock correction at the location named by `X-Location-Id`
#[utoipa::path(
    post,
    path = "/admin/inventory/adjust",
    request_body = AdjustStockRequest,
    params(("X-Location-Id" = uuid::Uuid, Header, description = "Location being adjusted")),
    responses(
        (status = 201, description = "Adjustment recorded", body = AdjustStockResult),
        (status = 400, description = "Invalid request or missing header", body = ErrorResponse),
        (status = 404, description = "Unknown product, location or lot", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    LocationHeader(location_id): LocationHeader,
    ValidatedJson(request): ValidatedJson<AdjustStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .services
        .adjustments
        .adjust(location_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Move stock between two locations as a linked pair of TRANSFER movements
#[utoipa::path(
    post,
    path = "/admin/inventory/transfer",
    request_body = TransferStockRequest,
    responses(
        (status = 201, description = "Both legs recorded", body = TransferStockResult),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Unknown product, location or lot", body = ErrorResponse),
        (status = 422, description = "Insufficient stock at the source", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<TransferStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.transfers.transfer(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Filtered movement history with product, location and lot details, newest first
#[utoipa::path(
    get,
    path = "/admin/inventory/kardex",
    params(KardexParams),
    responses(
        (
            status = 200,
            description = "Kardex rows, at most `limit` of them",
            body = [KardexEntry],
            headers(("x-total-count" = u64, description = "Rows matching the filter before the limit"))
        ),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn kardex(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<KardexParams>,
) -> Result<KardexPage, ServiceError> {
    let filter = KardexFilter::try_from(params)?;
    state.services.kardex.query(filter).await
}

/// Ledger stock per product and location, optionally scoped by `x-location-ids`
#[utoipa::path(
    get,
    path = "/admin/inventory/stock",
    params(
        StockLevelParams,
        ("x-location-ids" = Option<String>, Header, description = "Comma-separated location ids")
    ),
    responses(
        (status = 200, description = "Stock levels", body = [StockLevel]),
        (status = 400, description = "Malformed location header", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn stock_levels(
    State(state): State<AppState>,
    LocationIdsHeader(location_ids): LocationIdsHeader,
    ValidatedQuery(params): ValidatedQuery<StockLevelParams>,
) -> Result<Json<Vec<StockLevel>>, ServiceError> {
    let levels = state
        .services
        .movements
        .stock_levels(&location_ids, params.product_id)
        .await?;
    Ok(Json(levels))
}

/// Recompute every product's cached stock from the ledger
#[utoipa::path(
    post,
    path = "/admin/inventory/reconcile",
    params(ReconcileParams),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconciliationReport),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn reconcile_stock_cache(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<ReconcileParams>,
) -> Result<Json<ReconciliationReport>, ServiceError> {
    Ok(Json(
        state.services.reconciliation.reconcile(params.dry_run).await?,
    ))
}

/// Receive a batch of items, creating lots and RECEIPT movements
#[utoipa::path(
    post,
    path = "/inventory/receive",
    request_body = ReceiveInventoryRequest,
    params(("X-Location-Id" = Option<uuid::Uuid>, Header, description = "Used when the body has no locationId")),
    responses(
        (status = 201, description = "Batch received", body = ReceiveInventoryResult),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Unknown products (listed in details.missing)", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn receive_inventory(
    State(state): State<AppState>,
    OptionalLocationHeader(header_location): OptionalLocationHeader,
    ValidatedJson(mut request): ValidatedJson<ReceiveInventoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if request.location_id.is_none() {
        request.location_id = header_location;
    }
    let result = state.services.receiving.receive(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Available stock for one product at one location
#[utoipa::path(
    get,
    path = "/inventory/stock-available",
    params(StockAvailableParams),
    responses(
        (status = 200, description = "Ledger sum", body = StockAvailability),
        (status = 400, description = "Missing or malformed ids", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn stock_available(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<StockAvailableParams>,
) -> Result<Json<StockAvailability>, ServiceError> {
    let availability = state
        .services
        .movements
        .available(params.product_id, params.location_id)
        .await?;
    Ok(Json(availability))
}

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    entities::{location, lot, product, stock_movement},
    errors::ErrorResponse,
    handlers::{catalog, health, inventory, stock_movements},
    services::{
        adjustments::{AdjustStockRequest, AdjustStockResult},
        catalog::{CreateLocationRequest, CreateProductRequest},
        kardex::KardexEntry,
        ledger::StockLevel,
        movements::{CreateMovementRequest, StockAvailability},
        receiving::{ReceiveInventoryRequest, ReceiveInventoryResult, ReceiveItem},
        reconciliation::{ReconciliationReport, StockDrift},
        transfers::{TransferStockRequest, TransferStockResult},
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kiosk Inventory API",
        version = "1.0.0",
        description = r#"
Append-only stock movement ledger for kiosk inventory.

Every receipt, transfer, sale, return and adjustment is recorded as an immutable
movement. Stock at a location is the sum of its movements; the quantity on a
product is a cached total that can be rebuilt with the reconcile endpoint.

Location-scoped endpoints read the `X-Location-Id` header (or `X-Location-Ids`
for multi-location reads). Decimal quantities are serialized as strings.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    tags(
        (name = "inventory", description = "Receiving, transfers, adjustments and stock reads"),
        (name = "stock-movements", description = "Raw ledger access"),
        (name = "catalog", description = "Products, locations and lots"),
        (name = "health", description = "Liveness and database reachability")
    ),
    paths(
        inventory::adjust_stock,
        inventory::transfer_stock,
        inventory::kardex,
        inventory::stock_levels,
        inventory::reconcile_stock_cache,
        inventory::receive_inventory,
        inventory::stock_available,
        stock_movements::create_movement,
        stock_movements::list_movements,
        catalog::create_product,
        catalog::list_products,
        catalog::get_product,
        catalog::create_location,
        catalog::list_locations,
        catalog::list_lots,
        health::health_check,
    ),
    components(
        schemas(
            product::Model,
            location::Model,
            lot::Model,
            stock_movement::Model,
            stock_movement::MovementType,
            AdjustStockRequest,
            AdjustStockResult,
            TransferStockRequest,
            TransferStockResult,
            ReceiveItem,
            ReceiveInventoryRequest,
            ReceiveInventoryResult,
            CreateMovementRequest,
            StockAvailability,
            StockLevel,
            KardexEntry,
            StockDrift,
            ReconciliationReport,
            CreateProductRequest,
            CreateLocationRequest,
            health::HealthResponse,
            health::ComponentStatus,
            ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

/// Pretty-printed OpenAPI document, used by the admin CLI export.
pub fn openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_ledger_paths() {
        let json = openapi_json().unwrap();
        assert!(json.contains("Kiosk Inventory API"));
        assert!(json.contains("/admin/inventory/transfer"));
        assert!(json.contains("/inventory/receive"));
        assert!(json.contains("/stock-movements"));
        assert!(json.contains("ErrorResponse"));
    }
}

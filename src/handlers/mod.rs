pub mod catalog;
pub mod health;
pub mod inventory;
pub mod stock_movements;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        adjustments::AdjustmentService,
        catalog::CatalogService,
        kardex::{KardexPage, KardexService},
        movements::MovementService, receiving::ReceivingService,
        reconciliation::ReconciliationService, transfers::TransferService,
    },
};
use axum::{
    http::HeaderValue,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Number of rows matching a kardex filter, before the page limit.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

impl IntoResponse for KardexPage {
    fn into_response(self) -> Response {
        let total = HeaderValue::from(self.total);
        let mut response = Json(self.entries).into_response();
        response.headers_mut().insert(TOTAL_COUNT_HEADER, total);
        response
    }
}

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub receiving: Arc<ReceivingService>,
    pub transfers: Arc<TransferService>,
    pub adjustments: Arc<AdjustmentService>,
    pub movements: Arc<MovementService>,
    pub kardex: Arc<KardexService>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            receiving: Arc::new(ReceivingService::new(db_pool.clone(), event_sender.clone())),
            transfers: Arc::new(TransferService::new(db_pool.clone(), event_sender.clone())),
            adjustments: Arc::new(AdjustmentService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            movements: Arc::new(MovementService::new(db_pool.clone(), event_sender)),
            kardex: Arc::new(KardexService::new(
                db_pool.clone(),
                config.kardex_default_limit,
                config.kardex_max_limit,
            )),
            reconciliation: Arc::new(ReconciliationService::new(db_pool)),
        }
    }
}

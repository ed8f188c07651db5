//! Kiosk Inventory API
//!
//! Append-only stock movement ledger with receiving, transfers, adjustments,
//! kardex reporting and cache reconciliation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{routing::get, Router};
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender, &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// Builds the CORS layer. No configured origins means permissive.
fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                ::tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        if config.is_production() {
            ::tracing::warn!("No CORS origins configured in production; allowing any origin");
        }
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Full HTTP surface: ledger routes, catalog, health, metrics and Swagger UI.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = state.config.request_timeout();

    Router::<AppState>::new()
        .merge(handlers::inventory::inventory_routes())
        .merge(handlers::stock_movements::stock_movement_routes())
        .merge(handlers::catalog::catalog_routes())
        .merge(handlers::health::health_routes())
        .route("/metrics", get(metrics::metrics_handler))
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::errors::{ErrorResponse, ServiceError};
    pub use crate::events::{Event, EventSender};
    pub use crate::{app_router, AppState};
}

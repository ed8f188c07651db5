#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use kiosk_inventory_api::{
    app_router,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{location, lot, product, quantity::Quantity, stock_movement},
    events::{self, EventSender, LoggingEventHandler},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up the application against an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A second connection would open a different in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_with_config(&DbConfig::from(&cfg))
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(
            event_rx,
            vec![Arc::new(LoggingEventHandler)],
        ));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &sea_orm::DatabaseConnection {
        self.state.db.as_ref()
    }

    /// Send a request against the router with optional JSON body and extra headers.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body), &[]).await
    }

    pub async fn seed_product(&self, name: &str) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            sku: Set(Some(format!("SKU-{}", name.to_uppercase().replace(' ', "-")))),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_location(&self, name: &str) -> location::Model {
        location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            code: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed location")
    }

    pub async fn seed_lot(&self, product_id: Uuid, lot_code: &str) -> lot::Model {
        lot::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            lot_code: Set(lot_code.to_string()),
            expires_on: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed lot")
    }

    /// Inserts a ledger row directly, bypassing services. Used to backdate history.
    pub async fn seed_movement(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        lot_id: Uuid,
        movement_type: stock_movement::MovementType,
        quantity: Decimal,
        created_at: DateTime<Utc>,
    ) -> stock_movement::Model {
        stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            quantity: Set(Quantity::new(quantity).expect("storable quantity")),
            movement_type: Set(movement_type),
            location_id: Set(Some(location_id)),
            lot_id: Set(Some(lot_id)),
            reference: Set(None),
            reason: Set(None),
            created_at: Set(created_at),
        }
        .insert(self.db())
        .await
        .expect("seed movement")
    }

    pub async fn movement_count(&self, product_id: Uuid) -> u64 {
        stock_movement::Entity::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .count(self.db())
            .await
            .expect("count movements")
    }

    pub async fn cached_stock(&self, product_id: Uuid) -> Decimal {
        product::Entity::find_by_id(product_id)
            .one(self.db())
            .await
            .expect("load product")
            .expect("product exists")
            .stock_quantity
            .amount()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals are serialized as strings; compare numerically so scale differences don't matter.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}

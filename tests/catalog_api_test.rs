mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{decimal, response_json, TestApp};

#[tokio::test]
async fn products_and_locations_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .post("/products", json!({ "name": "Lemonade", "sku": "LEM-1" }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product = response_json(response).await;
    assert_eq!(decimal(&product["stockQuantity"]), rust_decimal::Decimal::ZERO);
    let product_id = product["id"].as_str().unwrap().to_string();

    let response = app.get(&format!("/products/{product_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["sku"], "LEM-1");

    let response = app.get(&format!("/products/{}", Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post("/locations", json!({ "name": "Pier kiosk" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get("/locations").await;
    let locations = response_json(response).await;
    assert_eq!(locations.as_array().unwrap().len(), 1);
    assert_eq!(locations[0]["name"], "Pier kiosk");

    let response = app.post("/products", json!({ "name": "  " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lots_can_be_filtered_by_product() {
    let app = TestApp::new().await;
    let a = app.seed_product("A").await;
    let b = app.seed_product("B").await;
    app.seed_lot(a.id, "A-1").await;
    app.seed_lot(a.id, "A-2").await;
    app.seed_lot(b.id, "B-1").await;

    let response = app.get(&format!("/lots?productId={}", a.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let lots = response_json(response).await;
    let codes: Vec<&str> = lots
        .as_array()
        .unwrap()
        .iter()
        .map(|lot| lot["lotCode"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["A-1", "A-2"]);

    let response = app.get("/lots").await;
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn health_metrics_and_docs_are_served() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"], "up");

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = response_json(response).await;
    assert!(doc["paths"]["/admin/inventory/transfer"].is_object());
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::new().await;

    let response = app
        .request(
            axum::http::Method::GET,
            "/health",
            None,
            &[("x-request-id", "req-kiosk-1")],
        )
        .await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-kiosk-1"
    );
}

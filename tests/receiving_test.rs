mod common;

use axum::http::{Method, StatusCode};
use kiosk_inventory_api::entities::lot;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use common::{decimal, response_json, TestApp};

#[tokio::test]
async fn batch_creates_one_movement_per_item_without_merging() {
    let app = TestApp::new().await;
    let product = app.seed_product("Juice").await;
    let location = app.seed_location("Warehouse").await;

    let response = app
        .post(
            "/inventory/receive",
            json!({
                "locationId": location.id,
                "reference": "PO-77",
                "notes": "morning delivery",
                "items": [
                    { "productId": product.id, "quantity": "6", "lotCode": "J-1" },
                    { "productId": product.id, "quantity": "4", "lotCode": "J-1" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    let movements = body["movements"].as_array().unwrap();
    assert_eq!(movements.len(), 2);
    for movement in movements {
        assert_eq!(movement["reference"], "PO-77");
        assert_eq!(movement["reason"], "morning delivery");
        assert_eq!(movement["locationId"], location.id.to_string());
    }
    // Same product and lot code resolves to one lot.
    assert_eq!(body["lots"][0]["id"], body["lots"][1]["id"]);
    assert_eq!(app.cached_stock(product.id).await, dec!(10));
    assert_eq!(app.movement_count(product.id).await, 2);
}

#[tokio::test]
async fn missing_products_are_listed_and_nothing_is_written() {
    let app = TestApp::new().await;
    let known = app.seed_product("Known").await;
    let ghost_a = Uuid::new_v4();
    let ghost_b = Uuid::new_v4();

    let response = app
        .post(
            "/inventory/receive",
            json!({
                "items": [
                    { "productId": ghost_a, "quantity": "1" },
                    { "productId": known.id, "quantity": "2" },
                    { "productId": ghost_b, "quantity": "3" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["code"], "missing_products");
    assert_eq!(
        body["details"]["missing"],
        json!([ghost_a.to_string(), ghost_b.to_string()])
    );

    assert_eq!(app.movement_count(known.id).await, 0);
    assert_eq!(app.cached_stock(known.id).await, dec!(0));
}

#[tokio::test]
async fn generated_lot_codes_use_receipt_prefix() {
    let app = TestApp::new().await;
    let product = app.seed_product("Bread").await;

    let response = app
        .post(
            "/inventory/receive",
            json!({ "items": [{ "productId": product.id, "quantity": "1.5" }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    let code = body["lots"][0]["lotCode"].as_str().unwrap();
    assert!(code.starts_with("RCV-"), "unexpected lot code {code}");
    assert_eq!(code.len(), "RCV-".len() + 8);
    assert!(body["movements"][0]["locationId"].is_null());
    assert_eq!(decimal(&body["movements"][0]["quantity"]), dec!(1.5));
}

#[tokio::test]
async fn existing_lot_expiry_is_overwritten() {
    let app = TestApp::new().await;
    let product = app.seed_product("Yogurt").await;
    let seeded = app.seed_lot(product.id, "Y-9").await;

    let response = app
        .post(
            "/inventory/receive",
            json!({
                "items": [{
                    "productId": product.id,
                    "quantity": "12",
                    "lotCode": "Y-9",
                    "expiresOn": "2031-03-01"
                }]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["lots"][0]["id"], seeded.id.to_string());

    let lots = lot::Entity::find()
        .filter(lot::Column::ProductId.eq(product.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(lots.len(), 1);
    assert_eq!(
        lots[0].expires_on,
        chrono::NaiveDate::from_ymd_opt(2031, 3, 1)
    );
}

#[tokio::test]
async fn location_header_fills_missing_body_location() {
    let app = TestApp::new().await;
    let product = app.seed_product("Coffee").await;
    let location = app.seed_location("Cafe").await;
    let header = location.id.to_string();

    let response = app
        .request(
            Method::POST,
            "/inventory/receive",
            Some(json!({ "items": [{ "productId": product.id, "quantity": "3" }] })),
            &[("x-location-id", header.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["movements"][0]["locationId"], header);
}

#[tokio::test]
async fn empty_and_non_positive_batches_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Tea").await;

    let response = app.post("/inventory/receive", json!({ "items": [] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/inventory/receive",
            json!({ "items": [{ "productId": product.id, "quantity": "-2" }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.movement_count(product.id).await, 0);
}

#[tokio::test]
async fn same_receipt_posted_twice_is_recorded_twice() {
    let app = TestApp::new().await;
    let product = app.seed_product("Water").await;
    let location = app.seed_location("Dock").await;
    let body = json!({
        "locationId": location.id,
        "reference": "PO-500",
        "items": [
            { "productId": product.id, "quantity": "8", "lotCode": "W-1" },
            { "productId": product.id, "quantity": "2.5", "lotCode": "W-2" }
        ]
    });

    for _ in 0..2 {
        let response = app.post("/inventory/receive", body.clone()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    assert_eq!(app.movement_count(product.id).await, 4);
    assert_eq!(app.cached_stock(product.id).await, dec!(21));
    let response = app
        .get(&format!(
            "/inventory/stock-available?productId={}&locationId={}",
            product.id, location.id
        ))
        .await;
    assert_eq!(decimal(&response_json(response).await["available"]), dec!(21));
}

#[tokio::test]
async fn fractional_receipts_sum_exactly() {
    let app = TestApp::new().await;
    let product = app.seed_product("Sugar").await;
    let location = app.seed_location("Pantry").await;

    for quantity in ["0.1", "0.2", "999999999999.9999"] {
        let response = app
            .post(
                "/inventory/receive",
                json!({
                    "locationId": location.id,
                    "items": [{ "productId": product.id, "quantity": quantity }]
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let exact = dec!(1000000000000.2999);
    let response = app
        .get(&format!(
            "/inventory/stock-available?productId={}&locationId={}",
            product.id, location.id
        ))
        .await;
    assert_eq!(decimal(&response_json(response).await["available"]), exact);
    assert_eq!(app.cached_stock(product.id).await, exact);
}

#[tokio::test]
async fn quantities_finer_than_four_places_or_too_large_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Vanilla").await;

    for quantity in ["0.00001", "1.23456", "1234567890123.4567"] {
        let response = app
            .post(
                "/inventory/receive",
                json!({ "items": [{ "productId": product.id, "quantity": quantity }] }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "quantity {quantity}");
        assert_eq!(response_json(response).await["code"], "validation_error");
    }
    assert_eq!(app.movement_count(product.id).await, 0);
}

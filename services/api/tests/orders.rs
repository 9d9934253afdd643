mod common;

use api_lib::web::rest::ApiDoc;
use axum::http::StatusCode;
use common::{line, TestApp};
use serde_json::json;
use utoipa::OpenApi;

async fn place_order(app: &TestApp) -> String {
    let res = app
        .post(
            "/api/checkout",
            json!({
                "cart": [line("abc123", "Mug", 100, 1)],
                "paymentMethod": "M-Pesa",
                "name": "Ada",
                "email": "ada@example.com",
                "shippingAddress": {"street": "1 Main St", "county": "Kiambu"},
            }),
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.body["orderId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn status_updates_accept_any_casing_and_store_lowercase() {
    let app = TestApp::new();
    let order_id = place_order(&app).await;
    let session = app.sign_up("admin@example.com").await;
    let cookies = [("session", session.as_str())];

    let res = app
        .put(
            "/api/order/update-order-status",
            json!({"orderId": order_id, "status": "Completed"}),
            &cookies,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    let order = app.get(&format!("/api/order/{order_id}"), &[]).await;
    assert_eq!(order.body["status"], "completed");
}

#[tokio::test]
async fn unknown_status_is_a_validation_error() {
    let app = TestApp::new();
    let order_id = place_order(&app).await;
    let session = app.sign_up("admin@example.com").await;

    let res = app
        .put(
            "/api/order/update-order-status",
            json!({"orderId": order_id, "status": "shipped"}),
            &[("session", session.as_str())],
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["fields"]["status"].is_array());
}

#[tokio::test]
async fn listing_filters_by_status_and_needs_a_session() {
    let app = TestApp::new();
    let first = place_order(&app).await;
    place_order(&app).await;

    let anonymous = app.get("/api/orders", &[]).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let session = app.sign_up("admin@example.com").await;
    let cookies = [("session", session.as_str())];
    app.put(
        "/api/order/update-order-status",
        json!({"orderId": first, "status": "cancelled"}),
        &cookies,
    )
    .await;

    let all = app.get("/api/orders", &cookies).await;
    assert_eq!(all.body["orders"].as_array().map(Vec::len), Some(2));

    let cancelled = app.get("/api/orders?status=CANCELLED", &cookies).await;
    let orders = cancelled.body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], first.as_str());
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::new();
    let res = app
        .get("/api/order/00000000-0000-4000-8000-000000000000", &[])
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.error_code(), Some("not_found"));
}

#[tokio::test]
async fn contact_messages_are_stored() {
    let app = TestApp::new();
    let res = app
        .post(
            "/api/contact",
            json!({
                "name": "Ada",
                "email": "ada@example.com",
                "subject": " ",
                "message": "Do you ship to Mombasa?",
            }),
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let stored = app.store.contact_messages().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].subject, None);
    assert_eq!(res.body["id"], stored[0].id.to_string());

    let blank = app
        .post(
            "/api/contact",
            json!({"name": "Ada", "email": "ada@example.com", "message": "   "}),
            &[],
        )
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.contact_messages().await.len(), 1);
}

#[tokio::test]
async fn health_and_openapi_document_are_served() {
    let app = TestApp::new();
    let res = app.get("/health", &[]).await;
    assert_eq!(res.body["status"], "ok");

    let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
    assert!(doc["paths"]["/api/checkout"]["post"].is_object());
    assert!(doc["paths"]["/api/order/restore-held-order/{id}"]["post"].is_object());
}

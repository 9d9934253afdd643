mod common;

use axum::http::StatusCode;
use common::{line, TestApp};
use serde_json::{json, Value};

fn checkout_body(cart: Vec<Value>) -> Value {
    json!({
        "cart": cart,
        "totalPrice": 200,
        "paymentMethod": "Cash on Delivery",
        "name": "Ada",
        "email": "ada@example.com",
        "mobileNumber": "0712345678",
        "shippingAddress": {"street": "1 Main St", "county": "Nairobi"},
    })
}

#[tokio::test]
async fn checkout_stores_a_pending_order_with_the_computed_total() {
    let app = TestApp::new();

    let res = app
        .post(
            "/api/checkout",
            checkout_body(vec![line("abc123", "Mug", 100, 2)]),
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let order_id = res.body["orderId"].as_str().unwrap().to_string();

    let order = app.get(&format!("/api/order/{order_id}"), &[]).await;
    assert_eq!(order.status, StatusCode::OK);
    assert_eq!(order.body["totalPrice"].as_f64(), Some(200.0));
    assert_eq!(order.body["status"], "pending");
    assert_eq!(order.body["items"][0]["productId"], "abc123");
    assert_eq!(order.body["items"][0]["quantity"], 2);
    assert_eq!(order.body["shippingAddress"]["county"], "Nairobi");
}

#[tokio::test]
async fn client_total_is_ignored_in_favour_of_the_lines() {
    let app = TestApp::new();
    let mut body = checkout_body(vec![line("abc123", "Mug", 100, 2)]);
    body["totalPrice"] = json!(5);

    let res = app.post("/api/checkout", body, &[]).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let order_id = res.body["orderId"].as_str().unwrap().to_string();

    let order = app.get(&format!("/api/order/{order_id}"), &[]).await;
    assert_eq!(order.body["totalPrice"].as_f64(), Some(200.0));
}

#[tokio::test]
async fn duplicate_lines_merge_before_the_order_is_built() {
    let app = TestApp::new();
    let res = app
        .post(
            "/api/checkout",
            checkout_body(vec![line("abc123", "Mug", 100, 1), line("abc123", "Mug", 100, 1)]),
            &[],
        )
        .await;
    let order_id = res.body["orderId"].as_str().unwrap().to_string();

    let order = app.get(&format!("/api/order/{order_id}"), &[]).await;
    assert_eq!(order.body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(order.body["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn empty_cart_never_creates_an_order() {
    let app = TestApp::new();
    let res = app.post("/api/checkout", checkout_body(vec![]), &[]).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.error_code(), Some("empty_cart"));
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn missing_payment_method_is_rejected() {
    let app = TestApp::new();
    let mut body = checkout_body(vec![line("abc123", "Mug", 100, 2)]);
    body["paymentMethod"] = json!("  ");

    let res = app.post("/api/checkout", body, &[]).await;
    assert_eq!(res.error_code(), Some("payment_method_required"));
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn missing_or_partial_address_asks_for_the_address_step() {
    let app = TestApp::new();

    let mut no_address = checkout_body(vec![line("abc123", "Mug", 100, 2)]);
    no_address.as_object_mut().unwrap().remove("shippingAddress");
    let res = app.post("/api/checkout", no_address, &[]).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.error_code(), Some("address_required"));

    let mut no_county = checkout_body(vec![line("abc123", "Mug", 100, 2)]);
    no_county["shippingAddress"] = json!({"street": "1 Main St", "county": ""});
    let res = app.post("/api/checkout", no_county, &[]).await;
    assert_eq!(res.error_code(), Some("address_required"));

    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn malformed_product_id_fails_the_whole_request() {
    let app = TestApp::new();
    let res = app
        .post(
            "/api/checkout",
            checkout_body(vec![
                line("abc123", "Mug", 100, 1),
                line("not a valid id!", "Ghost", 10, 1),
            ]),
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.error_code(), Some("invalid_product_id"));
    assert!(res.body["message"]
        .as_str()
        .unwrap()
        .contains("not a valid id!"));
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn invalid_fields_report_per_field_messages() {
    let app = TestApp::new();
    let mut body = checkout_body(vec![line("abc123", "Mug", 100, 0)]);
    body["email"] = json!("not-an-email");

    let res = app.post("/api/checkout", body, &[]).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.error_code(), Some("validation_failed"));
    assert!(res.body["fields"]["email"].is_array());
    assert!(res.body["fields"]["cart[0].quantity"].is_array());
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn resubmitting_with_the_same_idempotency_key_creates_one_order() {
    let app = TestApp::new();
    let mut body = checkout_body(vec![line("abc123", "Mug", 100, 2)]);
    body["idempotencyKey"] = json!("checkout-7f3a");

    let first = app.post("/api/checkout", body.clone(), &[]).await;
    let second = app.post("/api/checkout", body, &[]).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(first.body["orderId"], second.body["orderId"]);
    assert_eq!(app.store.order_count().await, 1);
}

#[tokio::test]
async fn successful_checkout_empties_the_session_cart() {
    let app = TestApp::new();
    let mug = app.seed_product("Mug", 100, true).await;
    let cart_session = app.add_to_cart(None, mug.id.as_str(), 2).await;

    let res = app
        .post(
            "/api/checkout",
            checkout_body(vec![line(mug.id.as_str(), "Mug", 100, 2)]),
            &[("cart_session", cart_session.as_str())],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let cart = app.get("/api/cart", &[("cart_session", cart_session.as_str())]).await;
    assert_eq!(cart.body["items"], json!([]));
}

#[tokio::test]
async fn failed_checkout_leaves_the_session_cart_alone() {
    let app = TestApp::new();
    let mug = app.seed_product("Mug", 100, true).await;
    let cart_session = app.add_to_cart(None, mug.id.as_str(), 2).await;

    let mut body = checkout_body(vec![line(mug.id.as_str(), "Mug", 100, 2)]);
    body["shippingAddress"] = Value::Null;
    let res = app
        .post("/api/checkout", body, &[("cart_session", cart_session.as_str())])
        .await;
    assert_eq!(res.error_code(), Some("address_required"));

    let cart = app.get("/api/cart", &[("cart_session", cart_session.as_str())]).await;
    assert_eq!(cart.body["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn out_of_range_prices_and_quantities_are_validation_errors() {
    let app = TestApp::new();
    let mut huge_price = line("abc123", "Yacht", 0, 10);
    huge_price["price"] = json!(1e28);
    let res = app
        .post("/api/checkout", checkout_body(vec![huge_price]), &[])
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["fields"]["cart[0].price"].is_array());

    let mut fractional_cent = line("abc123", "Mug", 0, 1);
    fractional_cent["price"] = json!(1.005);
    let res = app
        .post("/api/checkout", checkout_body(vec![fractional_cent]), &[])
        .await;
    assert!(res.body["fields"]["cart[0].price"].is_array());

    let res = app
        .post(
            "/api/checkout",
            checkout_body(vec![
                line("abc123", "Mug", 100, i64::MAX),
                line("abc123", "Mug", 100, i64::MAX),
            ]),
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["fields"]["cart[0].quantity"].is_array());
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn total_beyond_the_price_column_is_rejected() {
    let app = TestApp::new();
    let res = app
        .post(
            "/api/checkout",
            checkout_body(vec![line("abc123", "Yacht", 6_000_000_000, 2)]),
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.error_code(), Some("total_out_of_range"));
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn duplicate_lines_at_the_quantity_limit_merge_to_the_cap() {
    let app = TestApp::new();
    let res = app
        .post(
            "/api/checkout",
            checkout_body(vec![
                line("abc123", "Mug", 1, 10_000),
                line("abc123", "Mug", 1, 10_000),
            ]),
            &[],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let order_id = res.body["orderId"].as_str().unwrap().to_string();
    let order = app.get(&format!("/api/order/{order_id}"), &[]).await;
    assert_eq!(order.body["items"][0]["quantity"], 10_000);
    assert_eq!(order.body["totalPrice"].as_f64(), Some(10_000.0));
}

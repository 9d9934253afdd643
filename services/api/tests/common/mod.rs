//! Shared harness for the HTTP tests: a router over an in-memory store plus
//! small helpers for requests, cookies and seeding.

#![allow(dead_code)]

use api_lib::{adapters::MemoryStore, config::Config, web::build_router, web::AppState};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_core::domain::{NewProduct, Product};
use storefront_core::ports::DatabaseService;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The value of a cookie set by this response, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| {
                let pair = v.split(';').next()?;
                let (key, value) = pair.split_once('=')?;
                (key == name).then(|| value.to_string())
            })
    }

    pub fn error_code(&self) -> Option<&str> {
        self.body["error"].as_str()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(store.clone(), Arc::new(Config::default())));
        Self {
            router: build_router(state.clone()),
            store,
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookies: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            let cookie = cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookies: &[(&str, &str)]) -> TestResponse {
        self.request(Method::GET, uri, None, cookies).await
    }

    pub async fn post(&self, uri: &str, body: Value, cookies: &[(&str, &str)]) -> TestResponse {
        self.request(Method::POST, uri, Some(body), cookies).await
    }

    pub async fn put(&self, uri: &str, body: Value, cookies: &[(&str, &str)]) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), cookies).await
    }

    pub async fn delete(&self, uri: &str, cookies: &[(&str, &str)]) -> TestResponse {
        self.request(Method::DELETE, uri, None, cookies).await
    }

    /// Signs up a user and returns their `session` cookie value.
    pub async fn sign_up(&self, email: &str) -> String {
        let res = self
            .post(
                "/api/auth/signup",
                json!({"name": "Test Shopper", "email": email, "password": "correct horse"}),
                &[],
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {}", res.body);
        res.cookie("session").expect("signup sets a session cookie")
    }

    /// Adds `quantity` of `product_id` to a cart and returns the `cart_session` cookie.
    pub async fn add_to_cart(
        &self,
        cart_session: Option<&str>,
        product_id: &str,
        quantity: i64,
    ) -> String {
        let cookies: Vec<(&str, &str)> = cart_session
            .map(|c| ("cart_session", c))
            .into_iter()
            .collect();
        let res = self
            .post(
                "/api/cart/items",
                json!({"productId": product_id, "quantity": quantity}),
                &cookies,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "add to cart failed: {}", res.body);
        res.cookie("cart_session")
            .or_else(|| cart_session.map(str::to_string))
            .expect("cart session cookie")
    }

    pub async fn seed_product(&self, name: &str, price: i64, visible: bool) -> Product {
        self.store
            .create_product(NewProduct {
                name: name.to_string(),
                description: format!("A fine {name}"),
                price: Decimal::from(price),
                category: "kitchen".to_string(),
                image_urls: vec![format!("/img/{name}.png")],
                is_visible: visible,
            })
            .await
            .unwrap()
    }
}

pub fn line(product_id: &str, name: &str, price: i64, quantity: i64) -> Value {
    json!({
        "productId": product_id,
        "name": name,
        "price": price,
        "quantity": quantity,
        "imageUrls": [format!("/img/{name}.png")],
    })
}

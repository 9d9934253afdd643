//! services/api/src/web/cart.rs
//!
//! HTTP surface over the cart reducer. Each browser gets a cart keyed by the
//! `cart_session` cookie, issued the first time it adds something. Reading or
//! editing without a known cart answers with an empty one and stores nothing.

use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderName},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::{
    cart::{Cart, CartEvent, CartItem, CartProduct},
    domain::ProductId,
    ports::PortError,
};
use tokio::sync::Mutex;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::web::extract::{not_blank, ValidatedJson};
use crate::web::middleware::{cookie_value, set_cookie, CART_COOKIE};
use crate::web::state::AppState;

/// `Set-Cookie` header issued alongside a response when the cart is new.
pub type NewCartCookie = Option<[(HeaderName, String); 1]>;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub image_urls: Vec<String>,
    pub quantity: u32,
    /// `null` only if price × quantity overflows.
    pub line_total: Option<Decimal>,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            price: item.price,
            image_urls: item.image_urls.clone(),
            quantity: item.quantity,
            line_total: item.line_total(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total: Option<Decimal>,
    /// The notification to show, e.g. `{"kind": "added", "name": "Mug"}`.
    #[schema(value_type = Option<Object>)]
    pub event: Option<CartEvent>,
}

impl CartResponse {
    fn new(cart: &Cart, event: Option<CartEvent>) -> Json<Self> {
        Json(Self {
            items: cart.items().iter().map(CartItemResponse::from).collect(),
            total: cart.total(),
            event,
        })
    }
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[validate(custom(function = "not_blank"))]
    pub product_id: String,
    /// Defaults to 1. Negative values decrement an existing line.
    #[serde(default = "one")]
    #[validate(range(min = -10_000, max = 10_000, message = "Quantity must be between -10000 and 10000"))]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    /// Zero or less removes the line.
    #[validate(range(min = -10_000, max = 10_000, message = "Quantity must be between -10000 and 10000"))]
    pub quantity: i64,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClearCartParams {
    #[serde(default)]
    pub suppress_notification: bool,
}

//=========================================================================================
// Session Lookup
//=========================================================================================

fn cart_session_id(headers: &HeaderMap) -> Option<Uuid> {
    cookie_value(headers, CART_COOKIE).and_then(|raw| Uuid::parse_str(raw).ok())
}

/// The caller's cart, if their cookie names one this process issued.
pub async fn existing_cart(state: &AppState, headers: &HeaderMap) -> Option<Arc<Mutex<Cart>>> {
    state.carts.get(cart_session_id(headers)?).await
}

/// Returns the caller's cart, issuing a new `cart_session` cookie when they
/// have none or present one that is unknown here.
pub async fn session_cart(
    state: &AppState,
    headers: &HeaderMap,
) -> (Arc<Mutex<Cart>>, Option<String>) {
    if let Some(cart) = existing_cart(state, headers).await {
        return (cart, None);
    }
    let (session_id, cart) = state.carts.create().await;
    debug!(cart_session = %session_id, "Issuing new cart session");
    let max_age = state.config.session_ttl_days * 24 * 60 * 60;
    (cart, Some(set_cookie(CART_COOKIE, &session_id.to_string(), max_age)))
}

/// Empties the caller's cart without a notification. Used by checkout, hold and sign-out.
pub async fn clear_session_cart(state: &AppState, headers: &HeaderMap) {
    if let Some(session_id) = cart_session_id(headers) {
        state.carts.clear_quietly(session_id).await;
    }
}

/// Applies `op` to the caller's cart, or to a throwaway empty cart when they have none.
async fn apply_to_existing(
    state: &AppState,
    headers: &HeaderMap,
    op: impl FnOnce(&mut Cart) -> Option<CartEvent>,
) -> Json<CartResponse> {
    match existing_cart(state, headers).await {
        Some(cart) => {
            let mut cart = cart.lock().await;
            let event = op(&mut cart);
            CartResponse::new(&cart, event)
        }
        None => {
            let mut cart = Cart::new();
            let event = op(&mut cart);
            CartResponse::new(&cart, event)
        }
    }
}

pub fn cookie_header(cookie: Option<String>) -> NewCartCookie {
    cookie.map(|c| [(SET_COOKIE, c)])
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The current cart.
#[utoipa::path(
    get,
    path = "/api/cart",
    responses((status = 200, description = "Current cart", body = CartResponse))
)]
pub async fn get_cart_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<CartResponse> {
    apply_to_existing(&state, &headers, |_| None).await
}

/// Add a product, merging with an existing line.
///
/// Name, price and images are copied from the catalog at this moment.
#[utoipa::path(
    post,
    path = "/api/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Unknown or hidden product", body = crate::error::ErrorBody)
    )
)]
pub async fn add_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<AddItemRequest>,
) -> ApiResult<(NewCartCookie, Json<CartResponse>)> {
    let product_id = ProductId::new(req.product_id.trim());
    let product = state.db.get_product(&product_id).await?;
    if !product.is_visible {
        return Err(PortError::NotFound(format!("Product {product_id}")).into());
    }

    let (cart, cookie) = session_cart(&state, &headers).await;
    let mut cart = cart.lock().await;
    let event = cart.add_to_cart(CartProduct::from(&product), req.quantity);
    Ok((cookie_header(cookie), CartResponse::new(&cart, event)))
}

/// Set a line's quantity exactly. Zero or less removes it.
#[utoipa::path(
    put,
    path = "/api/cart/items/{productId}",
    params(("productId" = String, Path, description = "Product id")),
    request_body = UpdateItemRequest,
    responses((status = 200, description = "Updated cart", body = CartResponse))
)]
pub async fn update_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateItemRequest>,
) -> Json<CartResponse> {
    let product_id = ProductId::new(product_id);
    apply_to_existing(&state, &headers, |cart| {
        cart.update_quantity(&product_id, req.quantity)
    })
    .await
}

/// Drop a line from the cart.
#[utoipa::path(
    delete,
    path = "/api/cart/items/{productId}",
    params(("productId" = String, Path, description = "Product id")),
    responses((status = 200, description = "Updated cart", body = CartResponse))
)]
pub async fn remove_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Json<CartResponse> {
    let product_id = ProductId::new(product_id);
    apply_to_existing(&state, &headers, |cart| cart.remove_from_cart(&product_id)).await
}

/// Empty the cart.
#[utoipa::path(
    delete,
    path = "/api/cart",
    params(ClearCartParams),
    responses((status = 200, description = "Emptied cart", body = CartResponse))
)]
pub async fn clear_cart_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ClearCartParams>,
) -> Json<CartResponse> {
    apply_to_existing(&state, &headers, |cart| {
        cart.clear_cart(params.suppress_notification)
    })
    .await
}

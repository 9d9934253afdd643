//! services/api/src/web/checkout.rs
//!
//! The checkout endpoint, plus the cart-line payload shared with the hold endpoint.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::{
    cart::{Cart, CartProduct},
    domain::{CustomerContact, ShippingAddress},
    place_order, CheckoutRequest,
};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::web::extract::{storable_price, not_blank, ValidatedJson};
use crate::web::cart::clear_session_cart;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// One cart line as the storefront posts it.
#[derive(Deserialize, Validate, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CartLinePayload {
    #[serde(alias = "_id", alias = "id")]
    #[validate(custom(function = "not_blank"))]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[validate(custom(function = "storable_price"))]
    pub price: Decimal,
    #[validate(range(min = 1, max = 10_000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i64,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Folds posted lines through the cart reducer so duplicate products merge.
pub fn cart_from_lines(lines: Vec<CartLinePayload>) -> Cart {
    lines
        .into_iter()
        .map(|line| {
            (
                CartProduct {
                    id: line.product_id.trim().into(),
                    name: line.name,
                    price: line.price,
                    image_urls: line.image_urls,
                },
                line.quantity,
            )
        })
        .collect()
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub street: Option<String>,
    pub county: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[serde(default)]
    #[validate(nested)]
    pub cart: Vec<CartLinePayload>,
    /// The total the client displayed. The stored total is recomputed from the lines.
    pub total_price: Option<Decimal>,
    pub payment_method: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub mobile_number: String,
    pub shipping_address: Option<AddressPayload>,
    pub idempotency_key: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub message: String,
    pub order_id: Uuid,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Place an order from the posted cart.
///
/// On success the caller's session cart is emptied without a notification.
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutPayload,
    responses(
        (status = 201, description = "Order placed", body = CheckoutResponse),
        (status = 422, description = "Empty cart, missing payment method or address, bad product id, or invalid fields", body = crate::error::ErrorBody)
    )
)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<CheckoutPayload>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let shipping_address = payload.shipping_address.map(|a| ShippingAddress {
        street: a.street.unwrap_or_default(),
        county: a.county.unwrap_or_default(),
    });

    let request = CheckoutRequest {
        cart: cart_from_lines(payload.cart),
        client_total: payload.total_price,
        payment_method: payload.payment_method,
        customer: CustomerContact {
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            mobile_number: payload.mobile_number.trim().to_string(),
        },
        shipping_address,
        idempotency_key: payload.idempotency_key,
    };

    let order = place_order(state.db.as_ref(), request).await?;

    clear_session_cart(&state, &headers).await;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            message: "Order placed successfully".to_string(),
            order_id: order.id,
        }),
    ))
}

//! services/api/src/web/rest.rs
//!
//! The health check, small shared response bodies, and the master definition
//! for the OpenAPI specification.

use axum::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::error::ErrorBody;
use crate::web::{auth, cart, checkout, contact, held_orders, orders, products};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::update_me_handler,
        cart::get_cart_handler,
        cart::add_item_handler,
        cart::update_item_handler,
        cart::remove_item_handler,
        cart::clear_cart_handler,
        checkout::checkout_handler,
        held_orders::hold_order_handler,
        held_orders::list_held_orders_handler,
        held_orders::delete_held_order_handler,
        held_orders::restore_held_order_handler,
        products::list_products_handler,
        products::get_product_handler,
        products::create_product_handler,
        products::update_product_handler,
        products::delete_product_handler,
        products::product_details_handler,
        orders::list_orders_handler,
        orders::get_order_handler,
        orders::update_order_status_handler,
        contact::contact_handler,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            MessageResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::UpdateProfileRequest,
            auth::UserResponse,
            cart::CartResponse,
            cart::CartItemResponse,
            cart::AddItemRequest,
            cart::UpdateItemRequest,
            checkout::CheckoutPayload,
            checkout::CartLinePayload,
            checkout::AddressPayload,
            checkout::CheckoutResponse,
            held_orders::HoldOrderRequest,
            held_orders::HoldOrderResponse,
            held_orders::HeldOrdersResponse,
            held_orders::HeldOrderResponse,
            held_orders::RestoreResponse,
            products::ProductResponse,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            products::ProductUpdateFields,
            products::CatalogMessage,
            products::ProductDetailsResponse,
            orders::OrderResponse,
            orders::OrdersResponse,
            orders::UpdateOrderStatusRequest,
            contact::ContactRequest,
            contact::ContactResponse,
        )
    ),
    tags(
        (name = "Storefront API", description = "Cart, checkout, held orders and catalog administration.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Response Structs
//=========================================================================================

/// A bare `{message}` acknowledgement.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

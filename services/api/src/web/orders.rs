//! services/api/src/web/orders.rs
//!
//! Order administration: listing, the order-status view and status updates.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::domain::{Order, OrderStatus, UnknownOrderStatus};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::web::extract::{order_status, ValidatedJson, ValidatedQuery};
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub product_id: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Serialize, ToSchema)]
pub struct AddressResponse {
    pub street: String,
    pub county: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub items: Vec<OrderLineResponse>,
    pub total_price: Decimal,
    pub payment_method: String,
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    pub shipping_address: AddressResponse,
    /// One of `pending`, `active`, `processing`, `completed`, `cancelled`.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            items: order
                .items
                .into_iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
            total_price: order.total_price,
            payment_method: order.payment_method,
            name: order.customer.name,
            email: order.customer.email,
            mobile_number: order.customer.mobile_number,
            shipping_address: AddressResponse {
                street: order.shipping_address.street,
                county: order.shipping_address.county,
            },
            status: order.status.to_string(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct OrdersResponse {
    pub orders: Vec<OrderResponse>,
}

#[derive(Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Status filter, any casing.
    #[validate(custom(function = "order_status"))]
    pub status: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_id: Uuid,
    #[validate(custom(function = "order_status"))]
    pub status: String,
}

fn parse_status(raw: &str) -> ApiResult<OrderStatus> {
    raw.parse()
        .map_err(|e: UnknownOrderStatus| ApiError::BadRequest(e.to_string()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// All orders, newest first.
#[utoipa::path(
    get,
    path = "/api/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Orders", body = OrdersResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody)
    )
)]
pub async fn list_orders_handler(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<ListOrdersParams>,
) -> ApiResult<Json<OrdersResponse>> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let orders = state.db.list_orders(status).await?;
    Ok(Json(OrdersResponse {
        orders: orders.into_iter().map(Into::into).collect(),
    }))
}

/// The status view for a single order.
#[utoipa::path(
    get,
    path = "/api/order/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order", body = OrderResponse),
        (status = 404, description = "No such order", body = crate::error::ErrorBody)
    )
)]
pub async fn get_order_handler(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state.db.get_order(order_id).await?;
    Ok(Json(order.into()))
}

/// Move an order to a new status. Concurrent updates are last-write-wins.
#[utoipa::path(
    put,
    path = "/api/order/update-order-status",
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = MessageResponse),
        (status = 404, description = "No such order", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody)
    )
)]
pub async fn update_order_status_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<UpdateOrderStatusRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let status = parse_status(&req.status)?;
    state.db.update_order_status(req.order_id, status).await?;
    info!(order_id = %req.order_id, %status, "Order status updated");
    Ok(Json(MessageResponse {
        message: format!("Order status updated to {status}"),
    }))
}

//! services/api/src/web/held_orders.rs
//!
//! Hold, list, discard and restore parked carts. Every route here runs behind
//! `require_auth`, and a held order is only visible to the user whose email owns it.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::{
    discard_held_order, domain::normalize_email, hold_cart, restore_held_order, CartEvent,
    HeldOrder, SkippedLine,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::web::cart::{
    clear_session_cart, cookie_header, session_cart, CartItemResponse, NewCartCookie,
};
use crate::web::checkout::{cart_from_lines, CartLinePayload};
use crate::web::extract::ValidatedJson;
use crate::web::middleware::AuthUser;
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, Validate, ToSchema)]
pub struct HoldOrderRequest {
    pub email: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<CartLinePayload>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HoldOrderResponse {
    pub message: String,
    pub held_order_id: Uuid,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HeldOrdersParams {
    /// Defaults to the signed-in user's email.
    pub email: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeldLineResponse {
    pub product_id: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrderResponse {
    pub id: Uuid,
    pub user_email: String,
    pub items: Vec<HeldLineResponse>,
    pub held_at: DateTime<Utc>,
}

impl From<HeldOrder> for HeldOrderResponse {
    fn from(held: HeldOrder) -> Self {
        Self {
            id: held.id,
            user_email: held.user_email,
            items: held
                .items
                .into_iter()
                .map(|line| HeldLineResponse {
                    product_id: line.product_id.to_string(),
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
            held_at: held.held_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrdersResponse {
    pub held_orders: Vec<HeldOrderResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct RestoreResponse {
    pub items: Vec<CartItemResponse>,
    pub total: Option<Decimal>,
    #[schema(value_type = Vec<Object>)]
    pub restored: Vec<CartEvent>,
    #[schema(value_type = Vec<Object>)]
    pub skipped: Vec<SkippedLine>,
}

//=========================================================================================
// Helpers
//=========================================================================================

async fn session_email(state: &AppState, auth: &AuthUser) -> ApiResult<String> {
    let user = state.db.get_user_by_id(auth.user_id).await?;
    Ok(normalize_email(&user.email))
}

fn ensure_owner(owner: &str, session_email: &str) -> ApiResult<()> {
    if normalize_email(owner) != session_email {
        return Err(ApiError::Forbidden(
            "Held order belongs to another account".to_string(),
        ));
    }
    Ok(())
}

/// Loads the held order and checks it belongs to the signed-in user.
async fn owned_held_order(
    state: &AppState,
    auth: &AuthUser,
    held_order_id: Uuid,
) -> ApiResult<HeldOrder> {
    let held = state.db.get_held_order(held_order_id).await?;
    ensure_owner(&held.user_email, &session_email(state, auth).await?)?;
    Ok(held)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Park the posted cart lines for later and empty the session cart.
#[utoipa::path(
    post,
    path = "/api/hold-order",
    request_body = HoldOrderRequest,
    responses(
        (status = 201, description = "Cart held", body = HoldOrderResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
        (status = 403, description = "Email belongs to another account", body = crate::error::ErrorBody),
        (status = 422, description = "Empty cart or missing email", body = crate::error::ErrorBody)
    )
)]
pub async fn hold_order_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<HoldOrderRequest>,
) -> ApiResult<(StatusCode, Json<HoldOrderResponse>)> {
    let email = req.email.filter(|e| !e.trim().is_empty());
    if let Some(owner) = &email {
        ensure_owner(owner, &session_email(&state, &auth).await?)?;
    }

    let cart = cart_from_lines(req.items);
    let held = hold_cart(state.db.as_ref(), email.as_deref(), &cart).await?;

    clear_session_cart(&state, &headers).await;

    Ok((
        StatusCode::CREATED,
        Json(HoldOrderResponse {
            message: "Order held successfully".to_string(),
            held_order_id: held.id,
        }),
    ))
}

/// List the signed-in user's held orders, newest first.
#[utoipa::path(
    get,
    path = "/api/order/get-held-orders",
    params(HeldOrdersParams),
    responses(
        (status = 200, description = "Held orders", body = HeldOrdersResponse),
        (status = 403, description = "Email belongs to another account", body = crate::error::ErrorBody)
    )
)]
pub async fn list_held_orders_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<HeldOrdersParams>,
) -> ApiResult<Json<HeldOrdersResponse>> {
    let own_email = session_email(&state, &auth).await?;
    if let Some(requested) = params.email.filter(|e| !e.trim().is_empty()) {
        ensure_owner(&requested, &own_email)?;
    }

    let held_orders = state.db.list_held_orders(&own_email).await?;
    Ok(Json(HeldOrdersResponse {
        held_orders: held_orders.into_iter().map(Into::into).collect(),
    }))
}

/// Discard a held order without restoring it.
#[utoipa::path(
    delete,
    path = "/api/order/delete-held-order/{id}",
    params(("id" = Uuid, Path, description = "Held order id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Held order belongs to another account", body = crate::error::ErrorBody),
        (status = 404, description = "No such held order", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_held_order_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(held_order_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    owned_held_order(&state, &auth, held_order_id).await?;
    discard_held_order(state.db.as_ref(), held_order_id).await?;
    Ok(Json(MessageResponse {
        message: "Held order deleted".to_string(),
    }))
}

/// Merge a held order into the session cart and delete the snapshot.
///
/// Lines whose product has since been removed are skipped and listed in `skipped`.
#[utoipa::path(
    post,
    path = "/api/order/restore-held-order/{id}",
    params(("id" = Uuid, Path, description = "Held order id")),
    responses(
        (status = 200, description = "Restored into the session cart", body = RestoreResponse),
        (status = 403, description = "Held order belongs to another account", body = crate::error::ErrorBody),
        (status = 404, description = "No such held order", body = crate::error::ErrorBody)
    )
)]
pub async fn restore_held_order_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
    Path(held_order_id): Path<Uuid>,
) -> ApiResult<(NewCartCookie, Json<RestoreResponse>)> {
    owned_held_order(&state, &auth, held_order_id).await?;

    let (cart, new_cookie) = session_cart(&state, &headers).await;
    let mut cart = cart.lock().await;
    let report = restore_held_order(state.db.as_ref(), &mut cart, held_order_id).await?;

    let body = RestoreResponse {
        items: cart.items().iter().map(CartItemResponse::from).collect(),
        total: cart.total(),
        restored: report.restored,
        skipped: report.skipped,
    };
    Ok((cookie_header(new_cookie), Json(body)))
}

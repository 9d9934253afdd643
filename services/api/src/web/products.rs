//! services/api/src/web/products.rs
//!
//! Catalog endpoints: storefront listing and search, admin create/edit/delete,
//! and the batch detail lookup used when restoring held orders.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::domain::{NewProduct, Product, ProductId, ProductQuery, ProductUpdate};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::web::extract::{storable_price, not_blank, ValidatedJson};
use crate::web::state::AppState;

/// Most ids accepted by one product-details lookup.
const MAX_DETAIL_IDS: usize = 100;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_urls: Vec<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            image_urls: p.image_urls,
            is_visible: p.is_visible,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// The `{success, data}` envelope used by every catalog endpoint.
#[derive(Serialize, ToSchema)]
pub struct CatalogEnvelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> CatalogEnvelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct CatalogMessage {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListProductsParams {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_hidden: bool,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "storable_price"))]
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[validate(length(min = 1, message = "At least one image is required"))]
    pub image_urls: Vec<String>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Deserialize, Validate, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdateFields {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "storable_price"))]
    pub price: Option<Decimal>,
    pub category: Option<String>,
    #[validate(length(min = 1, message = "At least one image is required"))]
    pub image_urls: Option<Vec<String>>,
    pub is_visible: Option<bool>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(custom(function = "not_blank"))]
    pub id: String,
    #[validate(nested)]
    pub updates: ProductUpdateFields,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteProductParams {
    pub id: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductDetailsParams {
    /// Comma-separated product ids.
    pub ids: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: String,
    pub name: String,
    pub image_urls: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductDetailsResponse {
    pub products: Vec<ProductDetail>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List catalog products, newest first.
#[utoipa::path(
    get,
    path = "/api/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Matching products", body = CatalogEnvelope<Vec<ProductResponse>>)
    )
)]
pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListProductsParams>,
) -> ApiResult<Json<CatalogEnvelope<Vec<ProductResponse>>>> {
    let query = ProductQuery {
        category: params.category.filter(|c| !c.trim().is_empty()),
        search: params.search.filter(|s| !s.trim().is_empty()),
        include_hidden: params.include_hidden,
    };
    let products = state.db.list_products(&query).await?;
    Ok(CatalogEnvelope::ok(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

/// Fetch a single product.
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = CatalogEnvelope<ProductResponse>),
        (status = 404, description = "No such product", body = crate::error::ErrorBody)
    )
)]
pub async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CatalogEnvelope<ProductResponse>>> {
    let product = state.db.get_product(&ProductId::new(id)).await?;
    Ok(CatalogEnvelope::ok(product.into()))
}

/// Create a product (admin).
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Created", body = CatalogEnvelope<ProductResponse>),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody)
    )
)]
pub async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<CatalogEnvelope<ProductResponse>>)> {
    let product = state
        .db
        .create_product(NewProduct {
            name: req.name.trim().to_string(),
            description: req.description,
            price: req.price,
            category: req.category.trim().to_string(),
            image_urls: req.image_urls,
            is_visible: req.is_visible,
        })
        .await?;
    info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, CatalogEnvelope::ok(product.into())))
}

/// Apply a partial update to a product (admin). Also used to toggle visibility.
#[utoipa::path(
    put,
    path = "/api/products",
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated", body = CatalogEnvelope<ProductResponse>),
        (status = 404, description = "No such product", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody)
    )
)]
pub async fn update_product_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> ApiResult<Json<CatalogEnvelope<ProductResponse>>> {
    let fields = req.updates;
    let update = ProductUpdate {
        name: fields.name.map(|n| n.trim().to_string()),
        description: fields.description,
        price: fields.price,
        category: fields.category.map(|c| c.trim().to_string()),
        image_urls: fields.image_urls,
        is_visible: fields.is_visible,
    };
    let product = state
        .db
        .update_product(&ProductId::new(req.id), update)
        .await?;
    info!(product_id = %product.id, visible = product.is_visible, "Product updated");
    Ok(CatalogEnvelope::ok(product.into()))
}

/// Delete a product (admin).
#[utoipa::path(
    delete,
    path = "/api/products",
    params(DeleteProductParams),
    responses(
        (status = 200, description = "Deleted", body = CatalogMessage),
        (status = 404, description = "No such product", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteProductParams>,
) -> ApiResult<Json<CatalogMessage>> {
    let id = ProductId::new(params.id);
    state.db.delete_product(&id).await?;
    info!(product_id = %id, "Product deleted");
    Ok(Json(CatalogMessage {
        success: true,
        message: "Product deleted".to_string(),
    }))
}

/// Names and images for a batch of product ids. Unknown ids are left out.
#[utoipa::path(
    get,
    path = "/api/order/get-product-details",
    params(ProductDetailsParams),
    responses(
        (status = 200, description = "Known products", body = ProductDetailsResponse),
        (status = 400, description = "Too many or malformed ids", body = crate::error::ErrorBody)
    )
)]
pub async fn product_details_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductDetailsParams>,
) -> ApiResult<Json<ProductDetailsResponse>> {
    let ids: Vec<ProductId> = params
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ProductId::from)
        .collect();
    if ids.len() > MAX_DETAIL_IDS {
        return Err(ApiError::BadRequest(format!(
            "At most {MAX_DETAIL_IDS} ids per request"
        )));
    }
    if let Some(bad) = ids.iter().find(|id| !id.is_well_formed()) {
        return Err(ApiError::BadRequest(format!("Invalid product id: {bad}")));
    }

    let products = state.db.get_products_by_ids(&ids).await?;
    Ok(Json(ProductDetailsResponse {
        products: products
            .into_iter()
            .map(|p| ProductDetail {
                id: p.id.to_string(),
                name: p.name,
                image_urls: p.image_urls,
            })
            .collect(),
    }))
}

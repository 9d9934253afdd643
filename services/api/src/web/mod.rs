pub mod auth;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod extract;
pub mod held_orders;
pub mod middleware;
pub mod orders;
pub mod products;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Request bodies are small JSON documents.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Builds the API router with every route wired to `state`.
///
/// CORS and the Swagger UI are layered on by the binary.
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_layer = || axum_middleware::from_fn_with_state(state.clone(), require_auth);

    // Catalog reads are public; writes need a session.
    let products_root = get(products::list_products_handler).merge(
        post(products::create_product_handler)
            .put(products::update_product_handler)
            .delete(products::delete_product_handler)
            .route_layer(auth_layer()),
    );

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route(
            "/api/cart",
            get(cart::get_cart_handler).delete(cart::clear_cart_handler),
        )
        .route("/api/cart/items", post(cart::add_item_handler))
        .route(
            "/api/cart/items/{product_id}",
            put(cart::update_item_handler).delete(cart::remove_item_handler),
        )
        .route("/api/checkout", post(checkout::checkout_handler))
        .route("/api/products", products_root)
        .route("/api/products/{id}", get(products::get_product_handler))
        .route(
            "/api/order/get-product-details",
            get(products::product_details_handler),
        )
        .route("/api/order/{id}", get(orders::get_order_handler))
        .route("/api/contact", post(contact::contact_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/api/users/me",
            get(auth::me_handler).put(auth::update_me_handler),
        )
        .route("/api/hold-order", post(held_orders::hold_order_handler))
        .route(
            "/api/order/get-held-orders",
            get(held_orders::list_held_orders_handler),
        )
        .route(
            "/api/order/delete-held-order/{id}",
            delete(held_orders::delete_held_order_handler),
        )
        .route(
            "/api/order/restore-held-order/{id}",
            post(held_orders::restore_held_order_handler),
        )
        .route("/api/orders", get(orders::list_orders_handler))
        .route(
            "/api/order/update-order-status",
            put(orders::update_order_status_handler),
        )
        .route_layer(auth_layer());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! crates/storefront_core/src/ports.rs
//!
//! Defines the storage contract for the storefront's core logic.
//! The trait forms the boundary of the hexagonal architecture, so the cart,
//! checkout and held-order flows never depend on a concrete database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ContactMessage, HeldOrder, LineItem, NewContactMessage, NewOrder, NewProduct, NewUser, Order,
    OrderStatus, Product, ProductId, ProductQuery, ProductUpdate, ProfileUpdate, User,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---

    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn update_user_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user, or `PortError::Unauthorized` for unknown or expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Catalog ---
    async fn list_products(&self, query: &ProductQuery) -> PortResult<Vec<Product>>;

    async fn get_product(&self, product_id: &ProductId) -> PortResult<Product>;

    /// Batch lookup. Ids with no matching product are left out of the result.
    async fn get_products_by_ids(&self, product_ids: &[ProductId]) -> PortResult<Vec<Product>>;

    async fn create_product(&self, product: NewProduct) -> PortResult<Product>;

    async fn update_product(
        &self,
        product_id: &ProductId,
        update: ProductUpdate,
    ) -> PortResult<Product>;

    async fn delete_product(&self, product_id: &ProductId) -> PortResult<()>;

    // --- Orders ---

    /// Inserts the order. When `order.idempotency_key` was already used, the
    /// previously stored order is returned and nothing is written.
    async fn create_order(&self, order: NewOrder) -> PortResult<Order>;

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order>;

    async fn list_orders(&self, status: Option<OrderStatus>) -> PortResult<Vec<Order>>;

    async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> PortResult<()>;

    // --- Held Orders ---
    async fn create_held_order(
        &self,
        user_email: &str,
        items: Vec<LineItem>,
    ) -> PortResult<HeldOrder>;

    async fn get_held_order(&self, held_order_id: Uuid) -> PortResult<HeldOrder>;

    async fn list_held_orders(&self, user_email: &str) -> PortResult<Vec<HeldOrder>>;

    async fn delete_held_order(&self, held_order_id: Uuid) -> PortResult<()>;

    // --- Contact Messages ---
    async fn save_contact_message(&self, message: NewContactMessage)
        -> PortResult<ContactMessage>;
}

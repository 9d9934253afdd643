//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool};
use storefront_core::domain::{
    normalize_email, ContactMessage, CustomerContact, HeldOrder, LineItem, NewContactMessage,
    NewOrder, NewProduct, NewUser, Order, OrderStatus, Product, ProductId, ProductQuery,
    ProductUpdate, ProfileUpdate, ShippingAddress, User, UserCredentials,
};
use storefront_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, image_urls, is_visible, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, items, total_price, payment_method, customer_name, \
     customer_email, customer_mobile, shipping_street, shipping_county, status, \
     idempotency_key, created_at, updated_at";

//=========================================================================================
// Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    name: String,
    email: String,
    hashed_password: Option<String>,
    mobile_number: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            mobile_number: self.mobile_number,
            created_at: self.created_at,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ProductRecord {
    id: String,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    image_urls: Vec<String>,
    is_visible: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProductRecord {
    fn to_domain(self) -> Product {
        Product {
            id: ProductId::new(self.id),
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            image_urls: self.image_urls,
            is_visible: self.is_visible,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OrderRecord {
    id: Uuid,
    items: Json<Vec<LineItem>>,
    total_price: Decimal,
    payment_method: String,
    customer_name: String,
    customer_email: String,
    customer_mobile: String,
    shipping_street: String,
    shipping_county: String,
    status: String,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl OrderRecord {
    fn to_domain(self) -> PortResult<Order> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| PortError::Unexpected(format!("Order {}: {e}", self.id)))?;
        Ok(Order {
            id: self.id,
            items: self.items.0,
            total_price: self.total_price,
            payment_method: self.payment_method,
            customer: CustomerContact {
                name: self.customer_name,
                email: self.customer_email,
                mobile_number: self.customer_mobile,
            },
            shipping_address: ShippingAddress {
                street: self.shipping_street,
                county: self.shipping_county,
            },
            status,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct HeldOrderRecord {
    id: Uuid,
    user_email: String,
    items: Json<Vec<LineItem>>,
    held_at: DateTime<Utc>,
}
impl HeldOrderRecord {
    fn to_domain(self) -> HeldOrder {
        HeldOrder {
            id: self.id,
            user_email: self.user_email,
            items: self.items.0,
            held_at: self.held_at,
        }
    }
}

#[derive(FromRow)]
struct ContactMessageRecord {
    id: Uuid,
    name: String,
    email: String,
    subject: Option<String>,
    message: String,
    created_at: DateTime<Utc>,
}
impl ContactMessageRecord {
    fn to_domain(self) -> ContactMessage {
        ContactMessage {
            id: self.id,
            name: self.name,
            email: self.email,
            subject: self.subject,
            message: self.message,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let email = normalize_email(&user.email);
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, name, email, hashed_password, mobile_number) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING user_id, name, email, hashed_password, mobile_number, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&email)
        .bind(&user.hashed_password)
        .bind(&user.mobile_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("An account with email {email} already exists"))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let email = normalize_email(email);
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, name, email, hashed_password, mobile_number, created_at \
             FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {email} not found")))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, name, email, hashed_password, mobile_number, created_at \
             FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {user_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn update_user_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "UPDATE users SET name = COALESCE($2, name), \
             mobile_number = COALESCE($3, mobile_number) \
             WHERE user_id = $1 \
             RETURNING user_id, name, email, hashed_password, mobile_number, created_at",
        )
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.mobile_number)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {user_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_products(&self, query: &ProductQuery) -> PortResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::text IS NULL OR lower(category) = lower($1)) \
             AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' \
                  OR description ILIKE '%' || $2 || '%') \
             AND ($3 OR is_visible) \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(&query.category)
            .bind(&query.search)
            .bind(query.include_hidden)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(ProductRecord::to_domain).collect())
    }

    async fn get_product(&self, product_id: &ProductId) -> PortResult<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let record = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(product_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!(
                "Product {product_id} not found"
            )))?;
        Ok(record.to_domain())
    }

    async fn get_products_by_ids(&self, product_ids: &[ProductId]) -> PortResult<Vec<Product>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = product_ids.iter().map(ProductId::to_string).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        let records = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(ProductRecord::to_domain).collect())
    }

    async fn create_product(&self, product: NewProduct) -> PortResult<Product> {
        let sql = format!(
            "INSERT INTO products (id, name, description, price, category, image_urls, is_visible) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(ProductId::generate().to_string())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.category)
            .bind(&product.image_urls)
            .bind(product.is_visible)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_product(
        &self,
        product_id: &ProductId,
        update: ProductUpdate,
    ) -> PortResult<Product> {
        let sql = format!(
            "UPDATE products SET \
             name = COALESCE($2, name), \
             description = COALESCE($3, description), \
             price = COALESCE($4, price), \
             category = COALESCE($5, category), \
             image_urls = COALESCE($6, image_urls), \
             is_visible = COALESCE($7, is_visible), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(product_id.as_str())
            .bind(&update.name)
            .bind(&update.description)
            .bind(update.price)
            .bind(&update.category)
            .bind(&update.image_urls)
            .bind(update.is_visible)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!(
                "Product {product_id} not found"
            )))?;
        Ok(record.to_domain())
    }

    async fn delete_product(&self, product_id: &ProductId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Product {product_id} not found")));
        }
        Ok(())
    }

    async fn create_order(&self, order: NewOrder) -> PortResult<Order> {
        let sql = format!(
            "INSERT INTO orders (id, items, total_price, payment_method, customer_name, \
             customer_email, customer_mobile, shipping_street, shipping_county, status, \
             idempotency_key, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) \
             ON CONFLICT (idempotency_key) DO NOTHING \
             RETURNING {ORDER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(Json(&order.items))
            .bind(order.total_price)
            .bind(&order.payment_method)
            .bind(&order.customer.name)
            .bind(&order.customer.email)
            .bind(&order.customer.mobile_number)
            .bind(&order.shipping_address.street)
            .bind(&order.shipping_address.county)
            .bind(order.status.as_str())
            .bind(&order.idempotency_key)
            .bind(order.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;

        if let Some(record) = inserted {
            return record.to_domain();
        }

        // The insert was skipped, so the key belongs to an earlier order.
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1");
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(&order.idempotency_key)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("Order {order_id} not found")))?
            .to_domain()
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> PortResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(OrderRecord::to_domain).collect()
    }

    async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> PortResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(())
    }

    async fn create_held_order(
        &self,
        user_email: &str,
        items: Vec<LineItem>,
    ) -> PortResult<HeldOrder> {
        let record = sqlx::query_as::<_, HeldOrderRecord>(
            "INSERT INTO held_orders (id, user_email, items) VALUES ($1, $2, $3) \
             RETURNING id, user_email, items, held_at",
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(user_email))
        .bind(Json(&items))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_held_order(&self, held_order_id: Uuid) -> PortResult<HeldOrder> {
        let record = sqlx::query_as::<_, HeldOrderRecord>(
            "SELECT id, user_email, items, held_at FROM held_orders WHERE id = $1",
        )
        .bind(held_order_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!(
            "Held order {held_order_id} not found"
        )))?;
        Ok(record.to_domain())
    }

    async fn list_held_orders(&self, user_email: &str) -> PortResult<Vec<HeldOrder>> {
        let records = sqlx::query_as::<_, HeldOrderRecord>(
            "SELECT id, user_email, items, held_at FROM held_orders \
             WHERE user_email = $1 ORDER BY held_at DESC",
        )
        .bind(normalize_email(user_email))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(HeldOrderRecord::to_domain).collect())
    }

    async fn delete_held_order(&self, held_order_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM held_orders WHERE id = $1")
            .bind(held_order_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Held order {held_order_id} not found"
            )));
        }
        Ok(())
    }

    async fn save_contact_message(
        &self,
        message: NewContactMessage,
    ) -> PortResult<ContactMessage> {
        let record = sqlx::query_as::<_, ContactMessageRecord>(
            "INSERT INTO contact_messages (id, name, email, subject, message) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, email, subject, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.subject)
        .bind(&message.message)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }
}

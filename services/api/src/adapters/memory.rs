//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. It backs the
//! HTTP tests and `STORAGE_BACKEND=memory` for local runs; nothing survives a
//! restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use storefront_core::domain::{
    normalize_email, ContactMessage, HeldOrder, LineItem, NewContactMessage, NewOrder,
    NewProduct, NewUser, Order, OrderStatus, Product, ProductId, ProductQuery, ProductUpdate,
    ProfileUpdate, User, UserCredentials,
};
use storefront_core::ports::{DatabaseService, PortError, PortResult};
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredUser {
    user: User,
    hashed_password: Option<String>,
}

#[derive(Default)]
struct Tables {
    users: Vec<StoredUser>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    products: Vec<Product>,
    orders: Vec<Order>,
    held_orders: Vec<HeldOrder>,
    contact_messages: Vec<ContactMessage>,
}

/// A `DatabaseService` that keeps every table in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders. Used by tests to assert nothing was written.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn contact_messages(&self) -> Vec<ContactMessage> {
        self.tables.read().await.contact_messages.clone()
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let email = normalize_email(&user.email);
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.user.email == email) {
            return Err(PortError::Conflict(format!(
                "An account with email {email} already exists"
            )));
        }
        let created = User {
            user_id: Uuid::new_v4(),
            name: user.name,
            email,
            mobile_number: user.mobile_number,
            created_at: Utc::now(),
        };
        tables.users.push(StoredUser {
            user: created.clone(),
            hashed_password: user.hashed_password,
        });
        Ok(created)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| UserCredentials {
                user_id: u.user.user_id,
                email: u.user.email.clone(),
                hashed_password: u.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {email} not found")))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.user.user_id == user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {user_id} not found")))
    }

    async fn update_user_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .iter_mut()
            .find(|u| u.user.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {user_id} not found")))?;
        if let Some(name) = update.name {
            stored.user.name = name;
        }
        if let Some(mobile_number) = update.mobile_number {
            stored.user.mobile_number = Some(mobile_number);
        }
        Ok(stored.user.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables
            .write()
            .await
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let tables = self.tables.read().await;
        match tables.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_products(&self, query: &ProductQuery) -> PortResult<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        newest_first(&mut products, |p| p.created_at);
        Ok(products)
    }

    async fn get_product(&self, product_id: &ProductId) -> PortResult<Product> {
        let tables = self.tables.read().await;
        tables
            .products
            .iter()
            .find(|p| &p.id == product_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Product {product_id} not found")))
    }

    async fn get_products_by_ids(&self, product_ids: &[ProductId]) -> PortResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| product_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create_product(&self, product: NewProduct) -> PortResult<Product> {
        let now = Utc::now();
        let created = Product {
            id: ProductId::generate(),
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            image_urls: product.image_urls,
            is_visible: product.is_visible,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.products.push(created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        product_id: &ProductId,
        update: ProductUpdate,
    ) -> PortResult<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter_mut()
            .find(|p| &p.id == product_id)
            .ok_or_else(|| PortError::NotFound(format!("Product {product_id} not found")))?;
        update.apply_to(product, Utc::now());
        Ok(product.clone())
    }

    async fn delete_product(&self, product_id: &ProductId) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.products.len();
        tables.products.retain(|p| &p.id != product_id);
        if tables.products.len() == before {
            return Err(PortError::NotFound(format!("Product {product_id} not found")));
        }
        Ok(())
    }

    async fn create_order(&self, order: NewOrder) -> PortResult<Order> {
        let mut tables = self.tables.write().await;
        if let Some(key) = &order.idempotency_key {
            if let Some(existing) = tables
                .orders
                .iter()
                .find(|o| o.idempotency_key.as_ref() == Some(key))
            {
                return Ok(existing.clone());
            }
        }
        let created = Order {
            id: Uuid::new_v4(),
            items: order.items,
            total_price: order.total_price,
            payment_method: order.payment_method,
            customer: order.customer,
            shipping_address: order.shipping_address,
            status: order.status,
            idempotency_key: order.idempotency_key,
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        tables.orders.push(created.clone());
        Ok(created)
    }

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order> {
        let tables = self.tables.read().await;
        tables
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Order {order_id} not found")))
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> PortResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| PortError::NotFound(format!("Order {order_id} not found")))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn create_held_order(
        &self,
        user_email: &str,
        items: Vec<LineItem>,
    ) -> PortResult<HeldOrder> {
        let held = HeldOrder {
            id: Uuid::new_v4(),
            user_email: normalize_email(user_email),
            items,
            held_at: Utc::now(),
        };
        self.tables.write().await.held_orders.push(held.clone());
        Ok(held)
    }

    async fn get_held_order(&self, held_order_id: Uuid) -> PortResult<HeldOrder> {
        let tables = self.tables.read().await;
        tables
            .held_orders
            .iter()
            .find(|h| h.id == held_order_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Held order {held_order_id} not found")))
    }

    async fn list_held_orders(&self, user_email: &str) -> PortResult<Vec<HeldOrder>> {
        let email = normalize_email(user_email);
        let tables = self.tables.read().await;
        let mut held: Vec<HeldOrder> = tables
            .held_orders
            .iter()
            .filter(|h| h.user_email == email)
            .cloned()
            .collect();
        newest_first(&mut held, |h| h.held_at);
        Ok(held)
    }

    async fn delete_held_order(&self, held_order_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.held_orders.len();
        tables.held_orders.retain(|h| h.id != held_order_id);
        if tables.held_orders.len() == before {
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
        let saved = ContactMessage {
            id: Uuid::new_v4(),
            name: message.name,
            email: message.email,
            subject: message.subject,
            message: message.message,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .contact_messages
            .push(saved.clone());
        Ok(saved)
    }
}

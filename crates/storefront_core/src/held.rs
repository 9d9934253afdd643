//! crates/storefront_core/src/held.rs
//!
//! Parking a cart for later and bringing it back.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cart::{Cart, CartEvent, CartProduct};
use crate::domain::{normalize_email, HeldOrder, ProductId};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Debug, thiserror::Error)]
pub enum HoldError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Sign in to hold an order")]
    SignInRequired,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Persists a snapshot of `cart` for `email`.
///
/// The caller clears its cart once this returns `Ok`.
pub async fn hold_cart(
    db: &dyn DatabaseService,
    email: Option<&str>,
    cart: &Cart,
) -> Result<HeldOrder, HoldError> {
    if cart.is_empty() {
        return Err(HoldError::EmptyCart);
    }
    let email = email
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or(HoldError::SignInRequired)?;

    let held = db.create_held_order(&email, cart.to_held_lines()).await?;
    info!(held_order_id = %held.id, lines = held.items.len(), "Cart held");
    Ok(held)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    ProductNotFound,
    InvalidProductId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub reason: SkipReason,
}

/// What a restore did to the cart, line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub held_order_id: Uuid,
    pub restored: Vec<CartEvent>,
    pub skipped: Vec<SkippedLine>,
}

impl RestoreReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Merges a held order back into `cart` and deletes the snapshot.
///
/// Lines whose product no longer exists are skipped and reported; the
/// snapshot is deleted either way. The merge is built on a copy and only
/// written to `cart` once the snapshot is gone, so any storage failure
/// leaves both the cart and the snapshot as they were.
pub async fn restore_held_order(
    db: &dyn DatabaseService,
    cart: &mut Cart,
    held_order_id: Uuid,
) -> PortResult<RestoreReport> {
    let held = db.get_held_order(held_order_id).await?;

    let lookup: Vec<ProductId> = held
        .items
        .iter()
        .map(|line| line.product_id.clone())
        .filter(ProductId::is_well_formed)
        .collect();
    let products: HashMap<ProductId, _> = db
        .get_products_by_ids(&lookup)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut merged = cart.clone();
    let mut report = RestoreReport {
        held_order_id,
        ..RestoreReport::default()
    };
    for line in held.items {
        if !line.product_id.is_well_formed() {
            report.skipped.push(SkippedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                reason: SkipReason::InvalidProductId,
            });
            continue;
        }
        let Some(product) = products.get(&line.product_id) else {
            warn!(
                held_order_id = %held_order_id,
                product_id = %line.product_id,
                "Skipping held line: product no longer exists"
            );
            report.skipped.push(SkippedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                reason: SkipReason::ProductNotFound,
            });
            continue;
        };
        let snapshot = CartProduct {
            price: line.price,
            ..CartProduct::from(product)
        };
        if let Some(event) = merged.add_to_cart(snapshot, i64::from(line.quantity)) {
            report.restored.push(event);
        }
    }

    db.delete_held_order(held_order_id).await?;
    *cart = merged;
    info!(
        held_order_id = %held_order_id,
        restored = report.restored.len(),
        skipped = report.skipped.len(),
        "Held order restored"
    );
    Ok(report)
}

/// Deletes a held order without restoring it.
pub async fn discard_held_order(db: &dyn DatabaseService, held_order_id: Uuid) -> PortResult<()> {
    db.delete_held_order(held_order_id).await?;
    info!(held_order_id = %held_order_id, "Held order discarded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ContactMessage, LineItem, NewContactMessage, NewOrder, NewProduct, NewUser, Order,
        OrderStatus, Product, ProductQuery, ProductUpdate, ProfileUpdate, User, UserCredentials,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Serves one held order and a fixed catalog; lookups and deletes can be made to fail.
    struct SnapshotStore {
        held: Mutex<Option<HeldOrder>>,
        catalog: Vec<Product>,
        fail_lookup: bool,
        fail_delete: AtomicBool,
    }

    impl SnapshotStore {
        fn new(held: HeldOrder, catalog: Vec<Product>) -> Self {
            Self {
                held: Mutex::new(Some(held)),
                catalog,
                fail_lookup: false,
                fail_delete: AtomicBool::new(false),
            }
        }

        fn still_held(&self) -> bool {
            self.held.lock().unwrap().is_some()
        }
    }

    fn unused<T>() -> PortResult<T> {
        Err(PortError::Unexpected("not used by restore".into()))
    }

    #[async_trait]
    impl DatabaseService for SnapshotStore {
        async fn create_user(&self, _: NewUser) -> PortResult<User> {
            unused()
        }
        async fn get_user_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            unused()
        }
        async fn get_user_by_id(&self, _: Uuid) -> PortResult<User> {
            unused()
        }
        async fn update_user_profile(&self, _: Uuid, _: ProfileUpdate) -> PortResult<User> {
            unused()
        }
        async fn create_auth_session(&self, _: &str, _: Uuid, _: DateTime<Utc>) -> PortResult<()> {
            unused()
        }
        async fn validate_auth_session(&self, _: &str) -> PortResult<Uuid> {
            unused()
        }
        async fn delete_auth_session(&self, _: &str) -> PortResult<()> {
            unused()
        }
        async fn list_products(&self, _: &ProductQuery) -> PortResult<Vec<Product>> {
            unused()
        }
        async fn get_product(&self, _: &ProductId) -> PortResult<Product> {
            unused()
        }
        async fn get_products_by_ids(&self, ids: &[ProductId]) -> PortResult<Vec<Product>> {
            if self.fail_lookup {
                return Err(PortError::Unexpected("catalog unavailable".into()));
            }
            Ok(self
                .catalog
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        }
        async fn create_product(&self, _: NewProduct) -> PortResult<Product> {
            unused()
        }
        async fn update_product(&self, _: &ProductId, _: ProductUpdate) -> PortResult<Product> {
            unused()
        }
        async fn delete_product(&self, _: &ProductId) -> PortResult<()> {
            unused()
        }
        async fn create_order(&self, _: NewOrder) -> PortResult<Order> {
            unused()
        }
        async fn get_order(&self, _: Uuid) -> PortResult<Order> {
            unused()
        }
        async fn list_orders(&self, _: Option<OrderStatus>) -> PortResult<Vec<Order>> {
            unused()
        }
        async fn update_order_status(&self, _: Uuid, _: OrderStatus) -> PortResult<()> {
            unused()
        }
        async fn create_held_order(&self, _: &str, _: Vec<LineItem>) -> PortResult<HeldOrder> {
            unused()
        }
        async fn get_held_order(&self, held_order_id: Uuid) -> PortResult<HeldOrder> {
            self.held
                .lock()
                .unwrap()
                .clone()
                .filter(|h| h.id == held_order_id)
                .ok_or_else(|| PortError::NotFound(format!("Held order {held_order_id}")))
        }
        async fn list_held_orders(&self, _: &str) -> PortResult<Vec<HeldOrder>> {
            unused()
        }
        async fn delete_held_order(&self, held_order_id: Uuid) -> PortResult<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(PortError::Unexpected("connection reset".into()));
            }
            match self.held.lock().unwrap().take() {
                Some(_) => Ok(()),
                None => Err(PortError::NotFound(format!("Held order {held_order_id}"))),
            }
        }
        async fn save_contact_message(&self, _: NewContactMessage) -> PortResult<ContactMessage> {
            unused()
        }
    }

    fn mug() -> Product {
        let now = Utc::now();
        Product {
            id: "mug".into(),
            name: "Mug".into(),
            description: String::new(),
            price: Decimal::from(12),
            category: "kitchen".into(),
            image_urls: vec!["/img/mug.png".into()],
            is_visible: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(lines: &[(&str, u32)]) -> HeldOrder {
        HeldOrder {
            id: Uuid::new_v4(),
            user_email: "a@b.com".into(),
            items: lines
                .iter()
                .map(|(id, quantity)| LineItem {
                    product_id: (*id).into(),
                    quantity: *quantity,
                    price: Decimal::from(10),
                })
                .collect(),
            held_at: Utc::now(),
        }
    }

    fn cart_with_one_mug() -> Cart {
        let mut cart = Cart::new();
        cart.add_to_cart(CartProduct::from(&mug()), 1);
        cart
    }

    #[tokio::test]
    async fn restore_merges_skips_and_deletes_the_snapshot() {
        let held = snapshot(&[("mug", 2), ("gone", 1), ("bad id!", 1)]);
        let id = held.id;
        let store = SnapshotStore::new(held, vec![mug()]);
        let mut cart = cart_with_one_mug();

        let report = restore_held_order(&store, &mut cart, id).await.unwrap();
        assert_eq!(report.restored, vec![CartEvent::Updated("Mug".into())]);
        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            [SkipReason::ProductNotFound, SkipReason::InvalidProductId]
        );
        assert_eq!(cart.items()[0].quantity, 3);
        assert!(!store.still_held());
    }

    #[tokio::test]
    async fn failed_lookup_leaves_cart_and_snapshot_untouched() {
        let held = snapshot(&[("mug", 2)]);
        let id = held.id;
        let mut store = SnapshotStore::new(held, vec![mug()]);
        store.fail_lookup = true;
        let mut cart = cart_with_one_mug();
        let before = cart.clone();

        let err = restore_held_order(&store, &mut cart, id).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
        assert_eq!(cart, before);
        assert!(store.still_held());
    }

    #[tokio::test]
    async fn failed_delete_leaves_cart_untouched_so_a_retry_does_not_double() {
        let held = snapshot(&[("mug", 2)]);
        let id = held.id;
        let store = SnapshotStore::new(held, vec![mug()]);
        store.fail_delete.store(true, Ordering::SeqCst);
        let mut cart = cart_with_one_mug();
        let before = cart.clone();

        assert!(restore_held_order(&store, &mut cart, id).await.is_err());
        assert_eq!(cart, before);
        assert!(store.still_held());

        store.fail_delete.store(false, Ordering::SeqCst);
        restore_held_order(&store, &mut cart, id).await.unwrap();
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[tokio::test]
    async fn snapshot_already_restored_elsewhere_is_not_found() {
        let held = snapshot(&[("mug", 2)]);
        let id = held.id;
        let store = SnapshotStore::new(held, vec![mug()]);
        let mut first = Cart::new();
        restore_held_order(&store, &mut first, id).await.unwrap();

        let mut second = cart_with_one_mug();
        let err = restore_held_order(&store, &mut second, id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert_eq!(second.items()[0].quantity, 1);
    }
}

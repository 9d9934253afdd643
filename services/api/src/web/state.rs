//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-browser-session carts.

use crate::config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storefront_core::cart::Cart;
use storefront_core::ports::DatabaseService;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub carts: Arc<CartSessions>,
}

impl AppState {
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        Self {
            db,
            config,
            carts: Arc::new(CartSessions::default()),
        }
    }
}

//=========================================================================================
// CartSessions (One Cart Per Browser Session)
//=========================================================================================

/// Empty carts are dropped once they have sat untouched this long.
pub const EMPTY_CART_GRACE: Duration = Duration::from_secs(60 * 60);

/// How often the background sweep looks for idle carts.
pub const CART_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

struct CartEntry {
    cart: Arc<Mutex<Cart>>,
    touched: Instant,
}

/// Carts keyed by the `cart_session` cookie.
///
/// Only ids issued by [`CartSessions::create`] are ever stored. Each cart sits
/// behind its own mutex, so a long operation on one session (such as a restore
/// waiting on the database) never blocks another. Carts live only in process
/// memory and are evicted by [`CartSessions::evict_idle`].
#[derive(Default)]
pub struct CartSessions {
    carts: RwLock<HashMap<Uuid, CartEntry>>,
}

impl CartSessions {
    /// Returns the cart issued under `session_id` and marks it as used.
    pub async fn get(&self, session_id: Uuid) -> Option<Arc<Mutex<Cart>>> {
        let mut carts = self.carts.write().await;
        let entry = carts.get_mut(&session_id)?;
        entry.touched = Instant::now();
        Some(entry.cart.clone())
    }

    /// Issues an empty cart under a fresh id.
    pub async fn create(&self) -> (Uuid, Arc<Mutex<Cart>>) {
        let session_id = Uuid::new_v4();
        let cart = Arc::new(Mutex::new(Cart::new()));
        let entry = CartEntry {
            cart: cart.clone(),
            touched: Instant::now(),
        };
        self.carts.write().await.insert(session_id, entry);
        (session_id, cart)
    }

    /// Empties the cart for `session_id` if one exists. No notification is produced.
    pub async fn clear_quietly(&self, session_id: Uuid) {
        if let Some(cart) = self.get(session_id).await {
            cart.lock().await.clear_cart(true);
        }
    }

    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }

    /// Drops carts untouched for `idle_ttl`, and empty carts untouched for
    /// [`EMPTY_CART_GRACE`]. A cart a request is still holding is kept.
    /// Returns how many carts were dropped.
    pub async fn evict_idle(&self, now: Instant, idle_ttl: Duration) -> usize {
        let mut carts = self.carts.write().await;
        let before = carts.len();
        carts.retain(|_, entry| {
            if Arc::strong_count(&entry.cart) > 1 {
                return true;
            }
            let idle = now.saturating_duration_since(entry.touched);
            if idle >= idle_ttl {
                return false;
            }
            let empty = entry
                .cart
                .try_lock()
                .map(|cart| cart.is_empty())
                .unwrap_or(false);
            !(empty && idle >= EMPTY_CART_GRACE)
        });
        before - carts.len()
    }
}

/// Runs [`CartSessions::evict_idle`] every [`CART_SWEEP_INTERVAL`] until the process exits.
pub async fn sweep_idle_carts(carts: Arc<CartSessions>, idle_ttl: Duration) {
    let mut ticker = tokio::time::interval(CART_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let evicted = carts.evict_idle(Instant::now(), idle_ttl).await;
        if evicted > 0 {
            let remaining = carts.len().await;
            debug!(evicted, remaining, "Evicted idle carts");
        }
    }
}

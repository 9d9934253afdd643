//! crates/storefront_core/src/domain.rs
//!
//! Defines the core data structures for the storefront.
//! These structs are independent of any database driver; the `serde` derives
//! define the JSON document shape used for line items and API payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Product Identifiers
//=========================================================================================

/// Longest product reference accepted as well formed.
pub const MAX_PRODUCT_ID_LEN: usize = 64;

/// An opaque product reference.
///
/// Any string can be carried in a `ProductId`; use [`ProductId::is_well_formed`]
/// before trusting one that came from a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier for a newly created product.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 1..=64 characters of ASCII alphanumerics, `-` or `_`.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_PRODUCT_ID_LEN
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

//=========================================================================================
// Catalog
//=========================================================================================

/// Largest amount a `NUMERIC(12, 2)` column holds: 9,999,999,999.99.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Prices and order totals carry at most cents.
pub const PRICE_SCALE: u32 = 2;

/// True for a non-negative amount, in cents, that fits the storage column.
pub fn is_storable_amount(amount: &Decimal) -> bool {
    (!amount.is_sign_negative() || amount.is_zero())
        && *amount <= MAX_PRICE
        && amount.normalize().scale() <= PRICE_SCALE
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_urls: Vec<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a product that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_urls: Vec<String>,
    pub is_visible: bool,
}

/// A partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub is_visible: Option<bool>,
}

impl ProductUpdate {
    /// Applies the update in place and bumps `updated_at`.
    pub fn apply_to(self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(image_urls) = self.image_urls {
            product.image_urls = image_urls;
        }
        if let Some(is_visible) = self.is_visible {
            product.is_visible = is_visible;
        }
        product.updated_at = now;
    }
}

/// Filters for catalog listings.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub include_hidden: bool,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_hidden && !product.is_visible {
            return false;
        }
        if let Some(category) = &self.category {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

//=========================================================================================
// Orders
//=========================================================================================

/// One product/quantity/price entry within an Order or HeldOrder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
}

impl LineItem {
    /// Price × quantity, or `None` if that overflows.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub county: String,
}

impl ShippingAddress {
    pub fn is_complete(&self) -> bool {
        !self.street.trim().is_empty() && !self.county.trim().is_empty()
    }
}

/// The lifecycle state of an order.
///
/// The canonical form is lowercase; parsing accepts any casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Active,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Active,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownOrderStatus(s.to_string()))
    }
}

/// Contact fields copied onto an order. Free text, not a reference to a `User`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub mobile_number: String,
}

/// A persisted purchase request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub items: Vec<LineItem>,
    pub total_price: Decimal,
    pub payment_method: String,
    pub customer: CustomerContact,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order assembled at checkout but not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub items: Vec<LineItem>,
    pub total_price: Decimal,
    pub payment_method: String,
    pub customer: CustomerContact,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Held Orders
//=========================================================================================

/// A cart parked for later by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrder {
    pub id: Uuid,
    pub user_email: String,
    pub items: Vec<LineItem>,
    pub held_at: DateTime<Utc>,
}

//=========================================================================================
// Accounts
//=========================================================================================

// Represents a user - safe to hand to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    /// Absent for accounts created through an external identity provider.
    pub hashed_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub hashed_password: Option<String>,
    pub mobile_number: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub mobile_number: Option<String>,
}

/// Emails are unique ignoring case and surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Contact Messages
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

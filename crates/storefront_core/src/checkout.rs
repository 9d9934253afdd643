//! crates/storefront_core/src/checkout.rs
//!
//! Turns a cart into a persisted order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::cart::Cart;
use crate::domain::{
    is_storable_amount, CustomerContact, NewOrder, Order, OrderStatus, ProductId, ShippingAddress,
};
use crate::ports::{DatabaseService, PortError};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("A payment method must be selected")]
    PaymentMethodRequired,
    #[error("A shipping address with street and county is required")]
    AddressRequired,
    #[error("Invalid product id: {0}")]
    InvalidProductId(ProductId),
    #[error("Order total exceeds the largest amount that can be stored")]
    TotalOutOfRange,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Everything the storefront gathers before placing an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub cart: Cart,
    /// The total the client displayed. Informational only.
    pub client_total: Option<Decimal>,
    pub payment_method: Option<String>,
    pub customer: CustomerContact,
    pub shipping_address: Option<ShippingAddress>,
    pub idempotency_key: Option<String>,
}

/// Validates the request and builds the order to insert.
///
/// Checks run in a fixed order: empty cart, payment method, shipping address,
/// product references, then the total. The first failure wins.
pub fn assemble_order(
    request: CheckoutRequest,
    now: DateTime<Utc>,
) -> Result<NewOrder, CheckoutError> {
    if request.cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let payment_method = request
        .payment_method
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or(CheckoutError::PaymentMethodRequired)?;

    let shipping_address = request
        .shipping_address
        .filter(ShippingAddress::is_complete)
        .map(|a| ShippingAddress {
            street: a.street.trim().to_string(),
            county: a.county.trim().to_string(),
        })
        .ok_or(CheckoutError::AddressRequired)?;

    if let Some(bad) = request
        .cart
        .items()
        .iter()
        .find(|item| !item.product_id.is_well_formed())
    {
        return Err(CheckoutError::InvalidProductId(bad.product_id.clone()));
    }

    let items = request.cart.to_held_lines();
    let total_price = request
        .cart
        .total()
        .filter(is_storable_amount)
        .ok_or(CheckoutError::TotalOutOfRange)?;
    if let Some(client_total) = request.client_total {
        if client_total != total_price {
            warn!(
                %client_total,
                %total_price,
                "Client total disagrees with cart lines; storing the computed total"
            );
        }
    }

    Ok(NewOrder {
        items,
        total_price,
        payment_method,
        customer: request.customer,
        shipping_address,
        status: OrderStatus::Pending,
        idempotency_key: request
            .idempotency_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()),
        created_at: now,
    })
}

/// Assembles and persists an order with a single insert.
pub async fn place_order(
    db: &dyn DatabaseService,
    request: CheckoutRequest,
) -> Result<Order, CheckoutError> {
    let new_order = assemble_order(request, Utc::now())?;
    let order = db.create_order(new_order).await?;
    info!(order_id = %order.id, total = %order.total_price, "Order placed");
    Ok(order)
}

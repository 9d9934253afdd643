//! crates/storefront_core/src/cart.rs
//!
//! The shopping cart reducer.
//!
//! A `Cart` holds at most one line per product and never stores a quantity
//! below one: any operation that would take a line to zero or less removes it.
//! Quantities above [`MAX_LINE_QUANTITY`] are capped.
//! Every mutation is synchronous and returns the notification the storefront
//! should show, if any.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{LineItem, Product, ProductId};

/// Most units of one product a single cart line can hold.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Product display data copied into the cart when a line is added.
#[derive(Debug, Clone, PartialEq)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image_urls: Vec<String>,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image_urls: product.image_urls.clone(),
        }
    }
}

/// One line of the cart. Name, price and images are a snapshot taken at add time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image_urls: Vec<String>,
    pub quantity: u32,
}

impl CartItem {
    /// Price × quantity, or `None` if that overflows.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// The notification produced by a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum CartEvent {
    Added(String),
    Updated(String),
    Removed(String),
    Cleared,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Sum of price × quantity over every line, or `None` if it overflows.
    pub fn total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
    }

    /// Adds `quantity` of `product`, merging with an existing line.
    ///
    /// A negative quantity decrements; a line that reaches zero is removed.
    /// Adding a non-positive quantity of a product not in the cart does nothing.
    pub fn add_to_cart(&mut self, product: CartProduct, quantity: i64) -> Option<CartEvent> {
        match self.position(&product.id) {
            Some(idx) => {
                let merged = i64::from(self.items[idx].quantity).saturating_add(quantity);
                if merged <= 0 {
                    let removed = self.items.remove(idx);
                    Some(CartEvent::Removed(removed.name))
                } else {
                    let item = &mut self.items[idx];
                    item.quantity = clamp_quantity(merged);
                    Some(CartEvent::Updated(item.name.clone()))
                }
            }
            None if quantity > 0 => {
                let name = product.name.clone();
                self.items.push(CartItem {
                    product_id: product.id,
                    name: product.name,
                    price: product.price,
                    image_urls: product.image_urls,
                    quantity: clamp_quantity(quantity),
                });
                Some(CartEvent::Added(name))
            }
            None => None,
        }
    }

    /// Sets the quantity of an existing line exactly; zero or less removes it.
    ///
    /// Products not in the cart are left alone and produce no event.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> Option<CartEvent> {
        let idx = self.position(product_id)?;
        if quantity <= 0 {
            let removed = self.items.remove(idx);
            return Some(CartEvent::Removed(removed.name));
        }
        let item = &mut self.items[idx];
        item.quantity = clamp_quantity(quantity);
        Some(CartEvent::Updated(item.name.clone()))
    }

    pub fn remove_from_cart(&mut self, product_id: &ProductId) -> Option<CartEvent> {
        let idx = self.position(product_id)?;
        let removed = self.items.remove(idx);
        Some(CartEvent::Removed(removed.name))
    }

    /// Empties the cart. Sign-out passes `suppress_notification = true`.
    pub fn clear_cart(&mut self, suppress_notification: bool) -> Option<CartEvent> {
        self.items.clear();
        (!suppress_notification).then_some(CartEvent::Cleared)
    }

    /// The held-order snapshot format: product, quantity and price only.
    pub fn to_held_lines(&self) -> Vec<LineItem> {
        self.items
            .iter()
            .map(|item| LineItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                price: item.price,
            })
            .collect()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items.iter().position(|i| &i.product_id == product_id)
    }
}

impl FromIterator<(CartProduct, i64)> for Cart {
    /// Folds lines through `add_to_cart`, so duplicates merge and
    /// non-positive lines drop out.
    fn from_iter<T: IntoIterator<Item = (CartProduct, i64)>>(iter: T) -> Self {
        let mut cart = Cart::new();
        for (product, quantity) in iter {
            cart.add_to_cart(product, quantity);
        }
        cart
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.clamp(1, i64::from(MAX_LINE_QUANTITY))).unwrap_or(MAX_LINE_QUANTITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, price: i64) -> CartProduct {
        CartProduct {
            id: id.into(),
            name: name.into(),
            price: Decimal::from(price),
            image_urls: vec![format!("/img/{id}.png")],
        }
    }

    fn assert_invariants(cart: &Cart) {
        let mut seen = std::collections::HashSet::new();
        for item in cart.items() {
            assert!(item.quantity > 0, "stored non-positive quantity");
            assert!(seen.insert(item.product_id.clone()), "duplicate line");
        }
    }

    #[test]
    fn add_new_then_existing_merges_quantities() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.add_to_cart(product("p1", "Mug", 12), 1),
            Some(CartEvent::Added("Mug".into()))
        );
        assert_eq!(
            cart.add_to_cart(product("p1", "Mug", 12), 2),
            Some(CartEvent::Updated("Mug".into()))
        );
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total(), Some(Decimal::from(36)));
    }

    #[test]
    fn huge_quantities_saturate_at_the_line_cap() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("p1", "Mug", 12), i64::MAX);
        assert_eq!(
            cart.add_to_cart(product("p1", "Mug", 12), i64::MAX),
            Some(CartEvent::Updated("Mug".into()))
        );
        assert_eq!(cart.items()[0].quantity, MAX_LINE_QUANTITY);

        cart.update_quantity(&"p1".into(), i64::MAX);
        assert_eq!(cart.items()[0].quantity, MAX_LINE_QUANTITY);

        assert_eq!(
            cart.add_to_cart(product("p1", "Mug", 12), i64::MIN),
            Some(CartEvent::Removed("Mug".into()))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn overflowing_total_is_reported_not_panicked() {
        let mut cart = Cart::new();
        cart.add_to_cart(
            CartProduct {
                price: Decimal::from_i128_with_scale(10_i128.pow(28), 0),
                ..product("p1", "Yacht", 0)
            },
            10,
        );
        assert_eq!(cart.items()[0].line_total(), None);
        assert_eq!(cart.total(), None);
    }

    #[test]
    fn add_then_cancelling_add_removes_the_line() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("p1", "Mug", 12), 2);
        assert_eq!(
            cart.add_to_cart(product("p1", "Mug", 12), -2),
            Some(CartEvent::Removed("Mug".into()))
        );
        assert!(cart.get(&"p1".into()).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn non_positive_add_of_absent_product_is_a_no_op() {
        let mut cart = Cart::new();
        assert_eq!(cart.add_to_cart(product("p1", "Mug", 12), 0), None);
        assert_eq!(cart.add_to_cart(product("p1", "Mug", 12), -3), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_zero_removes_regardless_of_prior_quantity() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("p1", "Mug", 12), 40);
        assert_eq!(
            cart.update_quantity(&"p1".into(), 0),
            Some(CartEvent::Removed("Mug".into()))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_sets_exact_value() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("p1", "Mug", 12), 4);
        assert_eq!(
            cart.update_quantity(&"p1".into(), 7),
            Some(CartEvent::Updated("Mug".into()))
        );
        assert_eq!(cart.items()[0].quantity, 7);
    }

    #[test]
    fn updating_or_removing_an_absent_product_reports_nothing() {
        let mut cart = Cart::new();
        assert_eq!(cart.update_quantity(&"ghost".into(), 0), None);
        assert_eq!(cart.update_quantity(&"ghost".into(), 5), None);
        assert_eq!(cart.remove_from_cart(&"ghost".into()), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_can_suppress_its_notification() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("p1", "Mug", 12), 1);
        assert_eq!(cart.clear_cart(true), None);
        assert!(cart.is_empty());

        cart.add_to_cart(product("p1", "Mug", 12), 1);
        assert_eq!(cart.clear_cart(false), Some(CartEvent::Cleared));
    }

    #[test]
    fn mixed_operation_sequence_keeps_invariants() {
        let mut cart = Cart::new();
        let ops: [(&str, i64); 10] = [
            ("a", 3),
            ("b", 1),
            ("a", -1),
            ("c", -4),
            ("b", -5),
            ("a", 2),
            ("c", 6),
            ("a", -10),
            ("b", 2),
            ("c", 0),
        ];
        for (i, (id, qty)) in ops.iter().enumerate() {
            match i % 3 {
                0 => {
                    cart.add_to_cart(product(id, id, 5), *qty);
                }
                1 => {
                    cart.update_quantity(&(*id).into(), *qty);
                }
                _ => {
                    cart.add_to_cart(product(id, id, 5), *qty);
                    if *qty < 0 {
                        cart.remove_from_cart(&(*id).into());
                    }
                }
            }
            assert_invariants(&cart);
        }
    }

    #[test]
    fn collecting_lines_merges_duplicates_and_keeps_order() {
        let cart: Cart = vec![
            (product("p2", "Plate", 8), 1),
            (product("p1", "Mug", 12), 2),
            (product("p2", "Plate", 8), 3),
            (product("p3", "Bowl", 9), 0),
        ]
        .into_iter()
        .collect();
        let ids: Vec<_> = cart.items().iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, ["p2", "p1"]);
        assert_eq!(cart.get(&"p2".into()).map(|i| i.quantity), Some(4));
    }

    #[test]
    fn held_lines_carry_quantity_and_price() {
        let mut cart = Cart::new();
        cart.add_to_cart(product("p1", "Mug", 50), 2);
        let lines = cart.to_held_lines();
        assert_eq!(
            lines,
            vec![LineItem {
                product_id: "p1".into(),
                quantity: 2,
                price: Decimal::from(50),
            }]
        );
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let json = serde_json::to_value(CartEvent::Added("Mug".into())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "added", "name": "Mug"}));
        let json = serde_json::to_value(CartEvent::Cleared).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "cleared"}));
    }
}

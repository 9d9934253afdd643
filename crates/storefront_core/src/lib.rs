pub mod cart;
pub mod checkout;
pub mod domain;
pub mod held;
pub mod ports;

pub use cart::{Cart, CartEvent, CartItem, CartProduct};
pub use checkout::{assemble_order, place_order, CheckoutError, CheckoutRequest};
pub use domain::{
    ContactMessage, CustomerContact, HeldOrder, LineItem, NewOrder, Order, OrderStatus, Product,
    ProductId, ShippingAddress, User,
};
pub use held::{
    discard_held_order, hold_cart, restore_held_order, HoldError, RestoreReport, SkipReason,
    SkippedLine,
};
pub use ports::{DatabaseService, PortError, PortResult};

//! Domain models for the Bazaar API.
//!
//! These are the documents held by the store and, where the wire format
//! matches, the JSON bodies returned to clients.

pub mod cart;
pub mod order;
pub mod product;
pub mod testimonial;
pub mod user;

pub use cart::{Cart, CartItem, CartLine, CartView};
pub use order::{Order, OrderItem, OrderItemRequest, OrderList, OrderRequest, ShippingAddress};
pub use product::{Category, CategoryWithCount, Product, ProductPage, ProductQuery, ProductSort};
pub use testimonial::Testimonial;
pub use user::{User, UserProfile};

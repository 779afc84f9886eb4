//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the private row types
//! in [`crate::db`].

pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod user;

pub use order::{AdminOrder, Order, OrderItem, OrderItemDetail, OrderWithItems, ShippingAddress};
pub use product::{Product, ProductImage, ProductVariant};
pub use review::{AdminReview, PublicReview, Review};
pub use session::{CurrentUser, keys};
pub use user::User;

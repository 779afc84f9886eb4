//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login
//! - `cart` - In-memory session carts
//! - `catalog` - Product listing and detail aggregation
//! - `checkout` - Order placement
//! - `images` - Filesystem image discovery
//! - `reviews` - Review submission and edits

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod images;
pub mod reviews;

//! Paw Core - Shared types library.
//!
//! This crate provides common types used across all Paw components:
//! - `storefront` - Public JSON API (catalog, cart, checkout, admin)
//! - `cli` - Command-line tools for migrations, seeding and admin users
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database encoding is opt-in via the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, validated values (email, rating) and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

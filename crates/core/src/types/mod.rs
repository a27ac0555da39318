//! Core types for QKart.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod address;
pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod username;

pub use address::Address;
pub use cart::{CartEntry, LineItem, missing_products, reconcile, total_count, total_value};
pub use id::*;
pub use price::Price;
pub use product::Product;
pub use username::{Username, UsernameError};

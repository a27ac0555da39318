//! Cache types for backend responses.

use std::sync::Arc;

use qkart_core::Product;

/// Cache key for public, user-independent responses.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The full, unfiltered catalog.
    Catalog,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Catalog(Arc<Vec<Product>>),
}

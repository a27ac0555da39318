//! Catalog search support.
//!
//! Filtering happens on the backend (`GET /products/search`). This module
//! only decides *when* a search is worth sending: keystrokes arrive far
//! faster than results are useful, so each browser session is debounced.

mod debounce;

pub use debounce::{Debounced, SearchDebouncer};

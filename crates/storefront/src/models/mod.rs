//! Domain models for storefront.
//!
//! Catalog, cart, and address types come from `qkart-core`; the types here
//! only exist on the storefront side of the wire.

pub mod notification;
pub mod session;

pub use notification::{Level, Notification};
pub use session::{CurrentUser, SessionContext, keys as session_keys};

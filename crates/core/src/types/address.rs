//! Shipping address.

use serde::{Deserialize, Serialize};

use super::AddressId;

/// A free-text shipping address owned by the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    pub address: String,
}

//! Request and response bodies for the QKart REST API.
//!
//! Domain types (`Product`, `CartEntry`, `Address`) come from `qkart-core`;
//! this module only holds the envelopes specific to individual endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use qkart_core::{AddressId, Price, ProductId};

/// `POST /auth/login` and `POST /auth/register` body.
#[derive(Debug, Serialize)]
pub(crate) struct CredentialsBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /auth/login` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: SecretString,
    pub username: String,
    pub balance: Price,
}

/// `POST /cart` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartUpdateBody<'a> {
    pub product_id: &'a ProductId,
    pub qty: u32,
}

/// `POST /cart/checkout` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckoutBody<'a> {
    pub address_id: &'a AddressId,
}

/// `POST /cart/checkout` response.
///
/// The balance is only known when the backend reports it; an empty or
/// balance-less response leaves it `None`.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutReceipt {
    #[serde(default)]
    pub balance: Option<Price>,
}

/// `POST /user/addresses` body.
#[derive(Debug, Serialize)]
pub(crate) struct NewAddressBody<'a> {
    pub address: &'a str,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

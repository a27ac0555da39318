//! QKart REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS via `reqwest`, one method per backend endpoint
//! - The backend is the source of truth - no local persistence of carts,
//!   addresses, or balances
//! - The full catalog is cached in memory via `moka` (configurable TTL);
//!   searches and anything behind a bearer token are never cached
//!
//! # Endpoints
//!
//! ```text
//! GET    /products                  - full catalog
//! GET    /products/search?value=    - filtered catalog (404 = no match)
//! GET    /cart                      - raw cart entries          (bearer)
//! POST   /cart                      - add/update an entry       (bearer)
//! POST   /cart/checkout             - place the order           (bearer)
//! GET    /user/addresses            - list addresses            (bearer)
//! POST   /user/addresses            - add an address            (bearer)
//! DELETE /user/addresses/:id        - delete an address         (bearer)
//! POST   /auth/login                - token, username, balance
//! POST   /auth/register             - create an account
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use qkart_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//!
//! let catalog = client.get_products().await?;
//! let session = client.login(&username, &password).await?;
//! let cart = client.get_cart(&session.token).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the QKart backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No response was received (connection refused, DNS, timeout).
    #[error("Backend unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("Backend rejected request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: StatusCode,
        /// The `message` field of the error body, when there was one.
        message: Option<String>,
    },

    /// The backend answered 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body was not the expected JSON.
    #[error("Invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BackendError {
    /// Text to show the shopper.
    ///
    /// Uses the backend's own message when it sent one, `fallback` otherwise.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Whether no response was received at all.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// Whether the backend answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("/products/search".to_string());
        assert_eq!(err.to_string(), "Not found: /products/search");

        let err = BackendError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: Some("Product doesn't exist".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Backend rejected request (400 Bad Request): Product doesn't exist"
        );
    }

    #[test]
    fn test_rejected_without_message_display() {
        let err = BackendError::Rejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        };
        assert_eq!(
            err.to_string(),
            "Backend rejected request (500 Internal Server Error): no message"
        );
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = BackendError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            message: Some("Password is incorrect".to_string()),
        };
        assert_eq!(err.user_message("Login Failed"), "Password is incorrect");
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = BackendError::Rejected {
            status: StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(err.user_message("Login Failed"), "Login Failed");

        let err = BackendError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: Some(String::new()),
        };
        assert_eq!(err.user_message("Login Failed"), "Login Failed");

        let err = BackendError::NotFound("x".to_string());
        assert_eq!(
            err.user_message("Product Is Not Available."),
            "Product Is Not Available."
        );
    }

    #[test]
    fn test_error_kinds() {
        assert!(BackendError::NotFound("x".to_string()).is_not_found());
        assert!(
            !BackendError::Rejected {
                status: StatusCode::BAD_REQUEST,
                message: None,
            }
            .is_not_found()
        );
        assert!(!BackendError::InvalidUrl(url::ParseError::EmptyHost).is_unreachable());
    }
}

//! QKart REST API client implementation.
//!
//! Uses `reqwest` with JSON bodies. The full catalog is cached using `moka`;
//! everything else goes straight to the backend.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use qkart_core::{Address, AddressId, CartEntry, Product, ProductId};

use super::BackendError;
use super::cache::{CacheKey, CacheValue};
use super::types::{
    CartUpdateBody, CheckoutBody, CheckoutReceipt, CredentialsBody, ErrorBody, LoginResponse,
    NewAddressBody,
};
use crate::config::BackendConfig;

/// Longest slice of an unexpected response body that is logged.
const LOGGED_BODY_CHARS: usize = 500;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the QKart REST API.
///
/// Cheap to clone; all clones share the HTTP connection pool and the catalog
/// cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("qkart-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Resolve an API path against the configured base endpoint.
    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and return the raw body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path));
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|error| error.message);

            tracing::warn!(
                status = %status,
                path = %path,
                message = message.as_deref().unwrap_or(""),
                "Backend returned non-success status"
            );

            return Err(BackendError::Rejected { status, message });
        }

        Ok(body)
    }

    /// Send a request and parse the successful response as JSON.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.execute(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get the full catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(CacheValue::Catalog(products)) =
            self.inner.cache.get(&CacheKey::Catalog).await
        {
            debug!("Cache hit for catalog");
            return Ok(products);
        }

        let url = self.endpoint("products")?;
        let products: Vec<Product> = self
            .execute_json(self.request(Method::GET, url, None))
            .await?;
        let products = Arc::new(products);

        self.inner
            .cache
            .insert(CacheKey::Catalog, CacheValue::Catalog(Arc::clone(&products)))
            .await;

        debug!(count = products.len(), "Catalog fetched");
        Ok(products)
    }

    /// Search the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when nothing matches, or another
    /// error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, value: &str) -> Result<Vec<Product>, BackendError> {
        let url = self.endpoint("products/search")?;
        let request = self
            .request(Method::GET, url, None)
            .query(&[("value", value)]);

        self.execute_json(request).await
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get the signed-in user's raw cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &SecretString) -> Result<Vec<CartEntry>, BackendError> {
        let url = self.endpoint("cart")?;
        self.execute_json(self.request(Method::GET, url, Some(token)))
            .await
    }

    /// Set the quantity of a product in the cart.
    ///
    /// A quantity of zero removes the entry. Returns the updated cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn update_cart(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        qty: u32,
    ) -> Result<Vec<CartEntry>, BackendError> {
        let url = self.endpoint("cart")?;
        let request = self
            .request(Method::POST, url, Some(token))
            .json(&CartUpdateBody { product_id, qty });

        self.execute_json(request).await
    }

    /// Place the order for the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the order or the request fails.
    #[instrument(skip(self, token), fields(address_id = %address_id))]
    pub async fn checkout(
        &self,
        token: &SecretString,
        address_id: &AddressId,
    ) -> Result<CheckoutReceipt, BackendError> {
        let url = self.endpoint("cart/checkout")?;
        let request = self
            .request(Method::POST, url, Some(token))
            .json(&CheckoutBody { address_id });

        let body = self.execute(request).await?;
        if body.trim().is_empty() {
            return Ok(CheckoutReceipt::default());
        }

        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // Address Methods
    // =========================================================================

    /// List the signed-in user's addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_addresses(&self, token: &SecretString) -> Result<Vec<Address>, BackendError> {
        let url = self.endpoint("user/addresses")?;
        self.execute_json(self.request(Method::GET, url, Some(token)))
            .await
    }

    /// Add an address. Returns the updated address list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, address))]
    pub async fn add_address(
        &self,
        token: &SecretString,
        address: &str,
    ) -> Result<Vec<Address>, BackendError> {
        let url = self.endpoint("user/addresses")?;
        let request = self
            .request(Method::POST, url, Some(token))
            .json(&NewAddressBody { address });

        self.execute_json(request).await
    }

    /// Delete an address. Returns the updated address list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(address_id = %address_id))]
    pub async fn delete_address(
        &self,
        token: &SecretString,
        address_id: &AddressId,
    ) -> Result<Vec<Address>, BackendError> {
        let mut url = self.endpoint("user/addresses")?;
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(address_id.as_str());

        self.execute_json(self.request(Method::DELETE, url, Some(token)))
            .await
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are refused or the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, BackendError> {
        let url = self.endpoint("auth/login")?;
        let request = self.request(Method::POST, url, None).json(&CredentialsBody {
            username,
            password: password.expose_secret(),
        });

        self.execute_json(request).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the registration or the
    /// request fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<(), BackendError> {
        let url = self.endpoint("auth/register")?;
        let request = self.request(Method::POST, url, None).json(&CredentialsBody {
            username,
            password: password.expose_secret(),
        });

        self.execute(request).await.map(|_| ())
    }

    /// Drop the cached catalog so the next read refetches it.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate(&CacheKey::Catalog).await;
    }
}

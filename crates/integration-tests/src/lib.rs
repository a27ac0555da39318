//! Integration test harness for the QKart storefront.
//!
//! Each test starts two servers on ephemeral ports:
//!
//! - [`FakeBackend`] - an in-process stand-in for the QKart REST API with
//!   inspectable state (products, cart, addresses, wallet, call counters)
//! - the real storefront router, pointed at the fake backend
//!
//! [`TestContext`] drives the storefront through a cookie-keeping
//! `reqwest` client that follows redirects, so every form post lands on the
//! page that renders its flash notification.
//!
//! ```rust,ignore
//! let ctx = TestContext::start(FakeBackend::with_catalog()).await;
//! ctx.login().await;
//! let page = ctx.get("/").await;
//! assert!(page.body.contains("Logged in successfully"));
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use qkart_core::{Address, AddressId, CartEntry, Price, Product, ProductId};
use qkart_storefront::config::{BackendConfig, StorefrontConfig};
use qkart_storefront::state::AppState;

/// Username accepted by the fake backend.
pub const USERNAME: &str = "crio.do";

/// Password accepted by the fake backend.
pub const PASSWORD: &str = "learnwithcrio";

/// Bearer token issued by the fake backend.
const TOKEN: &str = "integration-token";

// =============================================================================
// Fake Backend
// =============================================================================

/// Mutable state behind the fake backend.
#[derive(Debug, Default)]
pub struct BackendData {
    pub products: Vec<Product>,
    pub cart: Vec<CartEntry>,
    pub addresses: Vec<Address>,
    pub balance: i64,
    /// Omit `balance` from checkout responses.
    pub hide_checkout_balance: bool,
    /// Hold `GET /user/addresses` this long before answering.
    pub addresses_delay: Duration,
    /// Hold `POST /cart/checkout` this long before acting on it.
    pub checkout_delay: Duration,
    pub next_address: u32,
    pub product_calls: u32,
    pub cart_updates: u32,
    pub checkout_calls: u32,
}

impl BackendData {
    fn cart_total(&self) -> i64 {
        self.cart
            .iter()
            .filter_map(|entry| {
                self.products
                    .iter()
                    .find(|p| p.id == entry.product_id)
                    .map(|p| p.cost.times(entry.qty).amount())
            })
            .sum()
    }
}

/// In-process QKart REST API.
#[derive(Clone, Default)]
pub struct FakeBackend {
    data: Arc<Mutex<BackendData>>,
}

/// Build a catalog product.
#[must_use]
pub fn product(id: &str, name: &str, cost: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        category: Some("Fashion".to_string()),
        image: format!("https://images.qkart.test/{id}.png"),
        cost: Price::new(cost),
        rating: 4,
    }
}

impl FakeBackend {
    /// Backend with a three-product catalog and a 5000 wallet.
    #[must_use]
    pub fn with_catalog() -> Self {
        let backend = Self::default();
        {
            let mut data = backend.data();
            data.products = vec![
                product("duffle", "Tan Leatherette Weekender Duffle", 150),
                product("shoes", "Black Running Shoes", 100),
                product("watch", "Smart Fitness Watch", 300),
            ];
            data.balance = 5000;
        }
        backend
    }

    /// Lock the backend state for inspection or seeding.
    pub fn data(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().expect("fake backend state poisoned")
    }

    /// Seed an address and return its id.
    pub fn add_address(&self, text: &str) -> AddressId {
        let mut data = self.data();
        data.next_address += 1;
        let id = AddressId::new(format!("addr-{}", data.next_address));
        data.addresses.push(Address {
            id: id.clone(),
            address: text.to_string(),
        });
        id
    }

    /// Seed a cart line.
    pub fn put_in_cart(&self, product_id: &str, qty: u32) {
        self.data().cart.push(CartEntry {
            product_id: ProductId::new(product_id),
            qty,
        });
    }

    fn router(self) -> Router {
        Router::new()
            .route("/products", get(products))
            .route("/products/search", get(search))
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/cart", get(cart).post(update_cart))
            .route("/cart/checkout", post(checkout))
            .route("/user/addresses", get(addresses).post(new_address))
            .route("/user/addresses/{id}", delete(remove_address))
            .with_state(self)
    }

    /// Serve on an ephemeral port and return the base URL.
    pub async fn spawn(self) -> String {
        let addr = serve(Router::new().nest("/api/v1", self.router())).await;
        format!("http://{addr}/api/v1/")
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

fn rejected(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get(header::AUTHORIZATION) {
        Some(value) if value.as_bytes() == expected.as_bytes() => Ok(()),
        _ => Err(rejected(StatusCode::UNAUTHORIZED, "Protected route, Oauth2 Bearer token not found")),
    }
}

async fn products(State(backend): State<FakeBackend>) -> Json<Vec<Product>> {
    let mut data = backend.data();
    data.product_calls += 1;
    Json(data.products.clone())
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    value: String,
}

async fn search(State(backend): State<FakeBackend>, Query(params): Query<SearchParams>) -> Response {
    let needle = params.value.to_lowercase();
    let found: Vec<Product> = backend
        .data()
        .products
        .iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();

    if found.is_empty() {
        (StatusCode::NOT_FOUND, Json(json!([]))).into_response()
    } else {
        Json(found).into_response()
    }
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn login(State(backend): State<FakeBackend>, Json(body): Json<Credentials>) -> Response {
    if body.username != USERNAME {
        return rejected(StatusCode::BAD_REQUEST, "Username does not exist");
    }
    if body.password != PASSWORD {
        return rejected(StatusCode::BAD_REQUEST, "Password is incorrect");
    }
    let balance = backend.data().balance;
    Json(json!({
        "success": true,
        "token": TOKEN,
        "username": USERNAME,
        "balance": balance,
    }))
    .into_response()
}

async fn register(Json(body): Json<Credentials>) -> Response {
    if body.username == USERNAME {
        return rejected(StatusCode::BAD_REQUEST, "Username is already taken");
    }
    (StatusCode::CREATED, Json(json!({ "success": true }))).into_response()
}

async fn cart(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    Json(backend.data().cart.clone()).into_response()
}

async fn update_cart(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<CartEntry>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let mut data = backend.data();
    data.cart_updates += 1;
    if !data.products.iter().any(|p| p.id == body.product_id) {
        return rejected(StatusCode::BAD_REQUEST, "Product doesn't exist");
    }
    data.cart.retain(|entry| entry.product_id != body.product_id);
    if body.qty > 0 {
        data.cart.push(body);
    }
    Json(data.cart.clone()).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody {
    address_id: AddressId,
}

async fn checkout(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let delay = backend.data().checkout_delay;
    tokio::time::sleep(delay).await;

    let mut data = backend.data();
    data.checkout_calls += 1;

    if !data.addresses.iter().any(|a| a.id == body.address_id) {
        return rejected(StatusCode::BAD_REQUEST, "Address not set");
    }
    let total = data.cart_total();
    if total > data.balance {
        return rejected(StatusCode::BAD_REQUEST, "Wallet balance not sufficient to place order");
    }
    data.balance -= total;
    data.cart.clear();

    if data.hide_checkout_balance {
        Json(json!({ "success": true })).into_response()
    } else {
        Json(json!({ "success": true, "balance": data.balance })).into_response()
    }
}

async fn addresses(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let delay = backend.data().addresses_delay;
    tokio::time::sleep(delay).await;

    Json(backend.data().addresses.clone()).into_response()
}

#[derive(Deserialize)]
struct NewAddress {
    address: String,
}

async fn new_address(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<NewAddress>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    if body.address.len() < 20 {
        return rejected(
            StatusCode::BAD_REQUEST,
            "\"address\" length must be at least 20 characters long",
        );
    }
    backend.add_address(&body.address);
    Json(backend.data().addresses.clone()).into_response()
}

async fn remove_address(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let mut data = backend.data();
    let before = data.addresses.len();
    data.addresses.retain(|a| a.id.as_str() != id);
    if data.addresses.len() == before {
        return rejected(StatusCode::NOT_FOUND, "Address to delete was not found");
    }
    Json(data.addresses.clone()).into_response()
}

// =============================================================================
// Storefront Driver
// =============================================================================

/// A rendered storefront response.
#[derive(Debug)]
pub struct Page {
    pub status: reqwest::StatusCode,
    /// Path of the final URL after redirects.
    pub path: String,
    pub body: String,
}

/// A running storefront wired to a [`FakeBackend`].
pub struct TestContext {
    pub backend: FakeBackend,
    pub base_url: String,
    pub client: Client,
}

impl TestContext {
    /// Start the fake backend and a storefront with search debouncing off.
    pub async fn start(backend: FakeBackend) -> Self {
        Self::start_with_debounce(backend, Duration::ZERO).await
    }

    /// Start with an explicit search debounce window.
    pub async fn start_with_debounce(backend: FakeBackend, debounce: Duration) -> Self {
        let backend_url = backend.clone().spawn().await;
        let mut config = StorefrontConfig::with_backend(
            BackendConfig::new(&backend_url).expect("backend config"),
        );
        config.search_debounce = debounce;

        let state = AppState::new(config).expect("storefront state");
        let addr = serve(qkart_storefront::app(state, None)).await;

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("http client");

        Self {
            backend,
            base_url: format!("http://{addr}"),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn page(response: reqwest::Response) -> Page {
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.text().await.expect("response body");
        Page { status, path, body }
    }

    /// GET a storefront path.
    pub async fn get(&self, path: &str) -> Page {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request");
        Self::page(response).await
    }

    /// POST a form and follow the redirect.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> Page {
        let response = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request");
        Self::page(response).await
    }

    /// Sign in with the fake backend's account.
    pub async fn login(&self) -> Page {
        self.post("/auth/login", &[("username", USERNAME), ("password", PASSWORD)])
            .await
    }
}

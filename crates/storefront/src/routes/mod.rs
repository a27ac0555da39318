//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Catalog (+ editable cart when signed in)
//! GET  /?value=term                   - Catalog filtered server-side (no-JS search)
//! GET  /products/search?value=        - Debounced grid fragment (204 if superseded)
//! GET  /health                        - Health check
//!
//! # Cart (requires auth)
//! POST /cart/add                      - Add one unit of a product
//! POST /cart/update                   - Set a quantity (0 removes)
//!
//! # Checkout (requires auth)
//! GET  /checkout                      - Addresses, wallet, read-only cart
//! POST /checkout/addresses            - Add an address
//! POST /checkout/addresses/{id}/delete - Delete an address
//! POST /checkout/place                - Validate and place the order
//! GET  /thanks                        - Order confirmation
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! POST /auth/logout                   - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router, http::Request, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::{
    create_session_layer, rate_limit::RateLimiterLayer, request_id_middleware,
    security_headers_middleware,
};
use crate::models::{CurrentUser, Notification, SessionContext};
use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

// =============================================================================
// Page Chrome
// =============================================================================

/// Data every full page needs for the shared header and notification area.
#[derive(Clone, Default)]
pub struct Layout {
    /// Signed-in username, shown next to the logout button.
    pub username: Option<String>,
    /// Flash notifications drained from the session.
    pub notifications: Vec<Notification>,
    /// Login and register pages replace the auth buttons with
    /// "Back to explore".
    pub auth_page: bool,
}

impl Layout {
    /// Drain pending notifications and describe the header for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(ctx: &SessionContext, user: Option<&CurrentUser>) -> Result<Self, AppError> {
        Ok(Self {
            username: user.map(|u| u.username.clone()),
            notifications: ctx.take_notifications().await?,
            auth_page: false,
        })
    }

    /// Layout for the login and register pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn for_auth_page(ctx: &SessionContext) -> Result<Self, AppError> {
        Ok(Self {
            username: None,
            notifications: ctx.take_notifications().await?,
            auth_page: true,
        })
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/addresses", post(checkout::add_address))
        .route("/addresses/{id}/delete", post(checkout::delete_address))
        .route("/place", post(checkout::place_order))
}

/// Create the main routes router (everything except `/auth`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/products/search", get(products::search))
        .route("/thanks", get(checkout::thanks))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
}

/// Build the complete application router.
///
/// `auth_limiter` is applied to `/auth` only; it needs peer addresses, so
/// pass `None` when the router is not served with connect info.
pub fn app(state: AppState, auth_limiter: Option<RateLimiterLayer>) -> Router {
    let auth = match auth_limiter {
        Some(limiter) => auth_routes().layer(limiter),
        None => auth_routes(),
    };

    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .nest("/auth", auth)
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

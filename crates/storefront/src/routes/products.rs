//! Catalog and search route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use qkart_core::Product;

use super::Layout;
use super::cart::{CartView, ReturnTo, load_line_items};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{Level, Notification, SessionContext};
use crate::search::Debounced;
use crate::state::AppState;

/// Shown when the catalog can't be loaded.
pub const CATALOG_FAILED: &str = "Failed to load products. Please try again later.";

/// Shown when a search matches nothing.
pub const NO_MATCH: &str = "Product Is Not Available.";

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub value: Option<String>,
}

impl SearchQuery {
    /// The trimmed search term, `None` when blank.
    fn term(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// Product grid display data.
#[derive(Clone, Default)]
pub struct ProductGrid {
    pub products: Vec<Product>,
    /// Inline message shown in place of an empty grid.
    pub error: Option<String>,
    /// Fragment-local notifications (search responses bypass the session).
    pub notifications: Vec<Notification>,
}

impl ProductGrid {
    fn of(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            products: Vec::new(),
            error: Some(message.to_string()),
            notifications: vec![Notification::error(message)],
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub search: String,
    pub grid: ProductGrid,
    pub cart: Option<CartView>,
}

/// Product grid fragment template (for `search.js`).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub grid: ProductGrid,
}

// =============================================================================
// Catalog Loading
// =============================================================================

/// Grid of backend search results for a non-blank term.
async fn search_grid(state: &AppState, term: &str) -> ProductGrid {
    match state.backend().search_products(term).await {
        Ok(products) => ProductGrid::of(products),
        Err(e) if e.is_not_found() => ProductGrid::failed(NO_MATCH),
        Err(e) => {
            tracing::warn!(error = %e, term, "Search failed");
            ProductGrid::failed(CATALOG_FAILED)
        }
    }
}

/// Display the catalog, plus the editable cart when signed in.
///
/// `?value=` filters the grid server-side for browsers without JavaScript.
#[instrument(skip(state, ctx, user))]
pub async fn index(
    State(state): State<AppState>,
    ctx: SessionContext,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<SearchQuery>,
) -> Result<ProductsIndexTemplate, AppError> {
    let catalog = match state.backend().get_products().await {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load catalog");
            ctx.notify(Level::Error, CATALOG_FAILED).await?;
            None
        }
    };
    let catalog: &[Product] = match &catalog {
        Some(catalog) => catalog.as_slice(),
        None => &[],
    };

    let mut grid = match query.term() {
        Some(term) => search_grid(&state, term).await,
        None => ProductGrid::of(catalog.to_vec()),
    };
    for notification in grid.notifications.drain(..) {
        ctx.notify(notification.level, notification.message).await?;
    }

    let cart = match &user {
        Some(user) => {
            let items = load_line_items(&state, &ctx, user, catalog).await?;
            Some(CartView::editable(items.unwrap_or_default(), ReturnTo::Catalog))
        }
        None => None,
    };

    Ok(ProductsIndexTemplate {
        layout: Layout::load(&ctx, user.as_ref()).await?,
        search: query.term().unwrap_or_default().to_string(),
        grid,
        cart,
    })
}

/// Debounced search fragment.
///
/// Returns `204 No Content` when a newer search from the same session
/// superseded this one; the backend is not called in that case.
#[instrument(skip(state, ctx))]
pub async fn search(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let key = ctx.key().await?;
    if state.debouncer().settle(&key).await == Debounced::Superseded {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let grid = match query.term() {
        Some(term) => search_grid(&state, term).await,
        None => match state.backend().get_products().await {
            Ok(catalog) => ProductGrid::of(catalog.to_vec()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load catalog");
                ProductGrid::failed(CATALOG_FAILED)
            }
        },
    };

    Ok(ProductGridTemplate { grid }.into_response())
}

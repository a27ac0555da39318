//! Cart route handlers.
//!
//! The cart is never stored locally: every render fetches the raw entries
//! from the backend and reconciles them against the catalog, and every
//! mutation is a plain form post followed by a redirect.

use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use qkart_core::{
    CartEntry, LineItem, Price, Product, ProductId, missing_products, reconcile, total_count,
    total_value,
};

use crate::backend::BackendError;
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Level, SessionContext};
use crate::state::AppState;

/// Shown when the raw cart can't be fetched.
pub const CART_FETCH_FAILED: &str =
    "Could not fetch cart details. Check that the backend is running, reachable and returns valid JSON.";

/// Shown when a cart mutation fails without a server message.
pub const CART_UPDATE_FAILED: &str = "Could not update the cart. Check that the backend is running.";

/// Shown when adding a product the cart already holds.
pub const ITEM_IN_CART: &str = "Item already in cart.";

/// Pages a quantity change may return to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ReturnTo {
    #[default]
    #[serde(rename = "/")]
    Catalog,
    #[serde(rename = "/checkout")]
    Checkout,
}

impl ReturnTo {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "/",
            Self::Checkout => "/checkout",
        }
    }
}

// =============================================================================
// View Types
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub cost: Price,
    pub qty: u32,
    /// Quantity posted by the "−" button; zero removes the line.
    pub decrement: u32,
    /// Quantity posted by the "+" button.
    pub increment: u32,
}

impl From<LineItem> for CartItemView {
    fn from(item: LineItem) -> Self {
        Self {
            decrement: item.qty.saturating_sub(1),
            increment: item.qty.saturating_add(1),
            product_id: item.product_id,
            name: item.name,
            image: item.image,
            cost: item.cost,
            qty: item.qty,
        }
    }
}

/// Cart display data for templates.
///
/// Editable carts carry −/+ controls and a checkout link; read-only carts
/// (checkout page) show static quantities and the order summary.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: Price,
    pub count: u32,
    pub editable: bool,
    pub return_to: ReturnTo,
}

impl CartView {
    fn new(items: Vec<LineItem>, editable: bool, return_to: ReturnTo) -> Self {
        let total = total_value(&items);
        let count = total_count(&items);
        Self {
            items: items.into_iter().map(CartItemView::from).collect(),
            total,
            count,
            editable,
            return_to,
        }
    }

    /// Cart with quantity controls that redirect back to `return_to`.
    #[must_use]
    pub fn editable(items: Vec<LineItem>, return_to: ReturnTo) -> Self {
        Self::new(items, true, return_to)
    }

    /// Cart with static quantities and the order summary.
    #[must_use]
    pub fn read_only(items: Vec<LineItem>) -> Self {
        Self::new(items, false, ReturnTo::Checkout)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Cart Loading
// =============================================================================

/// Fetch the raw cart and reconcile it against `catalog`.
///
/// The catalog is cached, so a product added to the backend after it was
/// cached can be in the cart but not in `catalog`. When that happens the
/// cache is dropped and the cart is reconciled once more against a fresh
/// catalog. Entries still unmatched after that are dropped and logged.
///
/// # Errors
///
/// Returns an error if the cart can't be fetched.
pub async fn fetch_line_items(
    state: &AppState,
    user: &CurrentUser,
    catalog: &[Product],
) -> Result<Vec<LineItem>, BackendError> {
    let entries = state.backend().get_cart(&user.token).await?;

    if missing_products(&entries, catalog).is_empty() {
        return Ok(reconcile(Some(entries.as_slice()), catalog).unwrap_or_default());
    }

    state.backend().invalidate_catalog().await;
    let fresh = match state.backend().get_products().await {
        Ok(fresh) => fresh,
        Err(e) => {
            tracing::warn!(error = %e, "Catalog refresh failed; reconciling against cached copy");
            return Ok(reconcile_logged(&entries, catalog));
        }
    };

    Ok(reconcile_logged(&entries, &fresh))
}

/// Reconcile, logging any entry the catalog doesn't know.
fn reconcile_logged(entries: &[CartEntry], catalog: &[Product]) -> Vec<LineItem> {
    let missing = missing_products(entries, catalog);
    if !missing.is_empty() {
        tracing::warn!(
            count = missing.len(),
            product_ids = ?missing,
            "Cart references products missing from the catalog"
        );
    }
    reconcile(Some(entries), catalog).unwrap_or_default()
}

/// [`fetch_line_items`], queueing an error notification on failure.
///
/// Returns `None` when the cart could not be fetched.
///
/// # Errors
///
/// Returns an error only if the session store fails.
pub async fn load_line_items(
    state: &AppState,
    ctx: &SessionContext,
    user: &CurrentUser,
    catalog: &[Product],
) -> Result<Option<Vec<LineItem>>, AppError> {
    match fetch_line_items(state, user, catalog).await {
        Ok(items) => Ok(Some(items)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch cart");
            ctx.notify(Level::Error, e.user_message(CART_FETCH_FAILED))
                .await?;
            Ok(None)
        }
    }
}

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
}

/// Update cart form data.
///
/// `qty` is unsigned, so a negative quantity is rejected before the handler
/// runs.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub qty: u32,
    #[serde(default)]
    pub return_to: ReturnTo,
}

// =============================================================================
// Handlers
// =============================================================================

/// Add one unit of a product to the cart.
///
/// Products already in the cart are left alone with a warning.
#[instrument(skip(state, ctx, user), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    ctx: SessionContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect, AppError> {
    let entries = match state.backend().get_cart(&user.token).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch cart before add");
            ctx.notify(Level::Error, e.user_message(CART_FETCH_FAILED))
                .await?;
            return Ok(Redirect::to("/"));
        }
    };

    if entries.iter().any(|entry| entry.product_id == form.product_id) {
        ctx.notify(Level::Warning, ITEM_IN_CART).await?;
        return Ok(Redirect::to("/"));
    }

    match state
        .backend()
        .update_cart(&user.token, &form.product_id, 1)
        .await
    {
        Ok(_) => add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", form.product_id.as_str())]),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to add item to cart");
            ctx.notify(Level::Error, e.user_message(CART_UPDATE_FAILED))
                .await?;
        }
    }

    Ok(Redirect::to("/"))
}

/// Set the quantity of a cart line.
///
/// The quantity is forwarded as posted; zero removes the line on the
/// backend.
#[instrument(skip(state, ctx, user), fields(product_id = %form.product_id, qty = form.qty))]
pub async fn update(
    State(state): State<AppState>,
    ctx: SessionContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect, AppError> {
    match state
        .backend()
        .update_cart(&user.token, &form.product_id, form.qty)
        .await
    {
        Ok(_) => add_breadcrumb(
            "cart",
            "Quantity changed",
            Some(&[("product_id", form.product_id.as_str())]),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update cart");
            ctx.notify(Level::Error, e.user_message(CART_UPDATE_FAILED))
                .await?;
        }
    }

    Ok(Redirect::to(form.return_to.as_str()))
}

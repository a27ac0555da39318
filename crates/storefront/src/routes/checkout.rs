//! Checkout route handlers.
//!
//! Checkout is one synchronous backend call guarded by local validation.
//! The order is only placed when the shopper's balance covers the cart, an
//! address exists, and one of them was picked.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use qkart_core::validation::{validate_checkout, validate_new_address};
use qkart_core::{Address, AddressId, Price, Product};

use super::Layout;
use super::cart::{CART_FETCH_FAILED, CartView, fetch_line_items, load_line_items};
use crate::backend::CheckoutReceipt;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Level, Notification, SessionContext};
use crate::state::AppState;

/// Shown when the catalog can't be loaded on the checkout page.
pub const PRODUCTS_FETCH_FAILED: &str =
    "Could not fetch products. Check that the backend is running, reachable and returns valid JSON.";

/// Shown when the address list can't be loaded.
pub const ADDRESSES_FETCH_FAILED: &str =
    "Could not fetch addresses. Check that the backend is running, reachable and returns valid JSON.";

/// Shown when adding an address fails without a server message.
pub const ADD_ADDRESS_FAILED: &str = "Could not add this address. Check that the backend is running.";

/// Shown when deleting an address fails without a server message.
pub const DELETE_ADDRESS_FAILED: &str =
    "Could not delete this address. Check that the backend is running.";

/// Shown when the backend refuses the order without a message.
pub const PLACE_ORDER_FAILED: &str = "Could not place order. Check your balance or try again later.";

/// Shown after a successful order.
pub const ORDER_PLACED: &str = "Order placed successfully!";

// =============================================================================
// Form Types
// =============================================================================

/// New address form data.
#[derive(Debug, Deserialize)]
pub struct NewAddressForm {
    pub address: String,
}

/// Place order form data.
///
/// `address_id` is absent when no radio button was picked.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    #[serde(default)]
    pub address_id: Option<AddressId>,
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub addresses: Vec<Address>,
    pub cart: CartView,
    /// Last balance confirmed by the backend, `None` if unconfirmed.
    pub balance: Option<Price>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/thanks.html")]
pub struct ThanksTemplate {
    pub layout: Layout,
    pub balance: Option<Price>,
}

// =============================================================================
// Loading Helpers
// =============================================================================

/// Fetch the catalog, queueing a notification and yielding an empty one on
/// failure.
async fn load_catalog(state: &AppState, ctx: &SessionContext) -> Result<Arc<Vec<Product>>, AppError> {
    match state.backend().get_products().await {
        Ok(catalog) => Ok(catalog),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load catalog");
            ctx.notify(Level::Error, e.user_message(PRODUCTS_FETCH_FAILED))
                .await?;
            Ok(Arc::new(Vec::new()))
        }
    }
}

/// Fetch the shopper's addresses; `None` (with a notification) on failure.
async fn load_addresses(
    state: &AppState,
    ctx: &SessionContext,
    user: &CurrentUser,
) -> Result<Option<Vec<Address>>, AppError> {
    match state.backend().get_addresses(&user.token).await {
        Ok(addresses) => Ok(Some(addresses)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch addresses");
            ctx.notify(Level::Error, ADDRESSES_FETCH_FAILED).await?;
            Ok(None)
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout page.
///
/// Backend calls run in sequence: catalog, cart, addresses.
#[instrument(skip(state, ctx, user))]
pub async fn show(
    State(state): State<AppState>,
    ctx: SessionContext,
    RequireAuth(user): RequireAuth,
) -> Result<CheckoutTemplate, AppError> {
    let catalog = load_catalog(&state, &ctx).await?;
    let items = load_line_items(&state, &ctx, &user, &catalog)
        .await?
        .unwrap_or_default();
    let addresses = load_addresses(&state, &ctx, &user)
        .await?
        .unwrap_or_default();

    Ok(CheckoutTemplate {
        layout: Layout::load(&ctx, Some(&user)).await?,
        addresses,
        cart: CartView::read_only(items),
        balance: user.balance,
    })
}

/// Add a shipping address.
#[instrument(skip(state, ctx, user, form))]
pub async fn add_address(
    State(state): State<AppState>,
    ctx: SessionContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<NewAddressForm>,
) -> Result<Redirect, AppError> {
    let address = match validate_new_address(&form.address) {
        Ok(address) => address,
        Err(e) => {
            ctx.notify(Level::Warning, e.to_string()).await?;
            return Ok(Redirect::to("/checkout"));
        }
    };

    if let Err(e) = state.backend().add_address(&user.token, &address).await {
        tracing::warn!(error = %e, "Failed to add address");
        ctx.notify(Level::Error, e.user_message(ADD_ADDRESS_FAILED))
            .await?;
    }

    Ok(Redirect::to("/checkout"))
}

/// Delete a shipping address.
#[instrument(skip(state, ctx, user))]
pub async fn delete_address(
    State(state): State<AppState>,
    ctx: SessionContext,
    RequireAuth(user): RequireAuth,
    Path(address_id): Path<AddressId>,
) -> Result<Redirect, AppError> {
    if let Err(e) = state
        .backend()
        .delete_address(&user.token, &address_id)
        .await
    {
        tracing::warn!(error = %e, "Failed to delete address");
        ctx.notify(Level::Error, e.user_message(DELETE_ADDRESS_FAILED))
            .await?;
    }

    Ok(Redirect::to("/checkout"))
}

/// Outcome of an order attempt, applied to the session only once the login
/// scope is known to be live.
enum OrderAttempt {
    Placed {
        address_id: AddressId,
        receipt: CheckoutReceipt,
    },
    Blocked(Notification),
}

/// Load everything checkout depends on, validate it, and place the order.
///
/// Touches only the backend; session writes happen in the caller.
async fn attempt_order(
    state: &AppState,
    user: &CurrentUser,
    selected: Option<&AddressId>,
) -> OrderAttempt {
    let catalog = match state.backend().get_products().await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load catalog");
            return OrderAttempt::Blocked(Notification::error(
                e.user_message(PRODUCTS_FETCH_FAILED),
            ));
        }
    };
    let items = match fetch_line_items(state, user, &catalog).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch cart");
            return OrderAttempt::Blocked(Notification::error(e.user_message(CART_FETCH_FAILED)));
        }
    };
    let addresses = match state.backend().get_addresses(&user.token).await {
        Ok(addresses) => addresses,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch addresses");
            return OrderAttempt::Blocked(Notification::error(ADDRESSES_FETCH_FAILED));
        }
    };

    let address_id = match validate_checkout(user.balance, &items, &addresses, selected) {
        Ok(address_id) => address_id,
        Err(e) => {
            tracing::info!(reason = %e, "Checkout blocked by validation");
            return OrderAttempt::Blocked(Notification::warning(e.to_string()));
        }
    };

    match state.backend().checkout(&user.token, &address_id).await {
        Ok(receipt) => OrderAttempt::Placed {
            address_id,
            receipt,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Checkout rejected");
            OrderAttempt::Blocked(Notification::error(e.user_message(PLACE_ORDER_FAILED)))
        }
    }
}

/// Validate and place the order.
///
/// Any local validation failure is a warning and the backend is not called.
/// On success the session balance is replaced by whatever the backend
/// reported, so an unreported balance becomes unconfirmed rather than
/// locally computed.
///
/// The whole attempt runs in the login scope. If the shopper signs out
/// meanwhile, the result is dropped without touching the session.
#[instrument(skip(state, ctx, user))]
pub async fn place_order(
    State(state): State<AppState>,
    ctx: SessionContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PlaceOrderForm>,
) -> Result<Redirect, AppError> {
    let attempt = state
        .lifecycles()
        .run(
            user.scope_id,
            attempt_order(&state, &user, form.address_id.as_ref()),
        )
        .await;

    match attempt {
        None => {
            tracing::info!("Signed out during checkout; result discarded");
            Ok(Redirect::to("/"))
        }
        Some(OrderAttempt::Placed {
            address_id,
            receipt,
        }) => {
            ctx.set_balance(receipt.balance).await?;
            ctx.notify(Level::Success, ORDER_PLACED).await?;
            add_breadcrumb(
                "checkout",
                "Order placed",
                Some(&[("address_id", address_id.as_str())]),
            );
            Ok(Redirect::to("/thanks"))
        }
        Some(OrderAttempt::Blocked(notification)) => {
            ctx.notify(notification.level, notification.message).await?;
            Ok(Redirect::to("/checkout"))
        }
    }
}

/// Order confirmation page.
#[instrument(skip(ctx, user))]
pub async fn thanks(
    ctx: SessionContext,
    RequireAuth(user): RequireAuth,
) -> Result<ThanksTemplate, AppError> {
    Ok(ThanksTemplate {
        layout: Layout::load(&ctx, Some(&user)).await?,
        balance: user.balance,
    })
}

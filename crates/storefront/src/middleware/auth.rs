//! Authentication extractors.
//!
//! Signed-out shoppers never see an error page: they are sent back to the
//! catalog with a notification explaining why.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::models::{CurrentUser, Level, SessionContext};
use crate::state::AppState;

/// Shown when a checkout page is opened without a session.
pub const CHECKOUT_LOGIN_REQUIRED: &str = "You must be logged in to access checkout page";

/// Shown when a cart action is attempted without a session.
pub const CART_LOGIN_REQUIRED: &str = "Login to add an item to the Cart";

/// Extractor that requires a signed-in shopper.
///
/// If nobody is signed in, queues a notification and redirects to `/`. A
/// session whose login scope has ended (signed out elsewhere, or idle past
/// expiry) counts as signed out and is cleared.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
pub enum AuthRejection {
    /// Back to the catalog; the reason is already queued in the session.
    RedirectToCatalog,
    /// The session itself could not be read.
    Session(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToCatalog => Redirect::to("/").into_response(),
            Self::Session(err) => err.into_response(),
        }
    }
}

/// Notification for a signed-out request to `path`.
fn login_required_notice(path: &str) -> (Level, &'static str) {
    if path.starts_with("/checkout") || path.starts_with("/thanks") {
        (Level::Info, CHECKOUT_LOGIN_REQUIRED)
    } else {
        (Level::Warning, CART_LOGIN_REQUIRED)
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state)
            .await
            .map_err(AuthRejection::Session)?;

        let user = match ctx.current_user().await.map_err(AuthRejection::Session)? {
            Some(user) if state.lifecycles().is_live(user.scope_id) => Some(user),
            Some(stale) => {
                tracing::info!(username = %stale.username, "Login scope gone; clearing session");
                ctx.sign_out().await.map_err(AuthRejection::Session)?;
                None
            }
            None => None,
        };

        match user {
            Some(user) => Ok(Self(user)),
            None => {
                // Nested routers strip their prefix from `parts.uri`
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map_or_else(|| parts.uri.path(), |uri| uri.0.path());
                let (level, message) = login_required_notice(path);
                ctx.notify(level, message)
                    .await
                    .map_err(AuthRejection::Session)?;
                Err(AuthRejection::RedirectToCatalog)
            }
        }
    }
}

/// Extractor that optionally gets the signed-in shopper.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is
/// signed in. A session with an ended login scope reads as signed out.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match SessionContext::from_request_parts(parts, state).await {
            Ok(ctx) => ctx.current_user().await.ok().flatten(),
            Err(_) => None,
        }
        .filter(|user| state.lifecycles().is_live(user.scope_id));

        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_required_notice_by_path() {
        assert_eq!(
            login_required_notice("/checkout"),
            (Level::Info, CHECKOUT_LOGIN_REQUIRED)
        );
        assert_eq!(
            login_required_notice("/checkout/place"),
            (Level::Info, CHECKOUT_LOGIN_REQUIRED)
        );
        assert_eq!(
            login_required_notice("/cart/add"),
            (Level::Warning, CART_LOGIN_REQUIRED)
        );
    }
}

//! Session-related types.
//!
//! Everything the storefront remembers about a shopper lives in the
//! tower-sessions record bound to the `qkart_session` cookie. Handlers never
//! touch the raw [`Session`]; they go through [`SessionContext`].

use std::fmt;

use axum::{extract::FromRequestParts, http::request::Parts};
use qkart_core::Price;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use super::notification::{Level, Notification};
use crate::error::AppError;

/// Session-stored identity of the signed-in shopper.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    /// Bearer token for the backend.
    #[serde(with = "secret_token")]
    pub token: SecretString,
    /// Wallet balance as last confirmed by the backend.
    ///
    /// `None` after a checkout whose response did not report a balance.
    pub balance: Option<Price>,
    /// Lifecycle scope of this login, see [`crate::lifecycle`].
    pub scope_id: Uuid,
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .field("balance", &self.balance)
            .field("scope_id", &self.scope_id)
            .finish()
    }
}

/// `SecretString` deliberately has no `Serialize`; the session store is the
/// one place the token is written out.
mod secret_token {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(token.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for pending flash notifications.
    pub const NOTIFICATIONS: &str = "notifications";
}

// =============================================================================
// SessionContext
// =============================================================================

/// Typed access to the shopper's session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ctx: SessionContext) -> Result<Redirect, AppError> {
///     ctx.notify(Level::Success, "Logged in successfully").await?;
///     Ok(Redirect::to("/"))
/// }
/// ```
#[derive(Clone)]
pub struct SessionContext {
    session: Session,
}

impl SessionContext {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// The signed-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, AppError> {
        Ok(self.session.get(keys::CURRENT_USER).await?)
    }

    /// Store a freshly authenticated user.
    ///
    /// The session id is cycled so a pre-login cookie can't be replayed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn sign_in(&self, user: &CurrentUser) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        self.session.insert(keys::CURRENT_USER, user).await?;
        Ok(())
    }

    /// Replace the stored wallet balance.
    ///
    /// Does nothing when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn set_balance(&self, balance: Option<Price>) -> Result<(), AppError> {
        if let Some(mut user) = self.current_user().await? {
            user.balance = balance;
            self.session.insert(keys::CURRENT_USER, &user).await?;
        }
        Ok(())
    }

    /// Forget the signed-in user, returning who it was.
    ///
    /// Pending notifications survive so the next page can still show them.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn sign_out(&self) -> Result<Option<CurrentUser>, AppError> {
        let user = self
            .session
            .remove::<CurrentUser>(keys::CURRENT_USER)
            .await?;
        self.session.cycle_id().await?;
        Ok(user)
    }

    /// Queue a notification for the next rendered page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn notify(&self, level: Level, message: impl Into<String>) -> Result<(), AppError> {
        let mut pending: Vec<Notification> = self
            .session
            .get(keys::NOTIFICATIONS)
            .await?
            .unwrap_or_default();
        pending.push(Notification::new(level, message));
        self.session.insert(keys::NOTIFICATIONS, pending).await?;
        Ok(())
    }

    /// Drain the pending notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn take_notifications(&self) -> Result<Vec<Notification>, AppError> {
        Ok(self
            .session
            .remove::<Vec<Notification>>(keys::NOTIFICATIONS)
            .await?
            .unwrap_or_default())
    }

    /// Stable identifier of the browser session, for per-session bookkeeping.
    ///
    /// A session that has never been written has no id yet; it is assigned
    /// one by writing an empty notification list.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn key(&self) -> Result<String, AppError> {
        if let Some(id) = self.session.id() {
            return Ok(id.to_string());
        }
        if self
            .session
            .get::<Vec<Notification>>(keys::NOTIFICATIONS)
            .await?
            .is_none()
        {
            self.session
                .insert(keys::NOTIFICATIONS, Vec::<Notification>::new())
                .await?;
        }
        self.session.save().await?;
        self.session
            .id()
            .map(|id| id.to_string())
            .ok_or_else(|| AppError::Internal("session id missing after save".to_string()))
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        Ok(Self::new(session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use secrecy::ExposeSecret;
    use tower_sessions::MemoryStore;

    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            username: "crio.do".to_string(),
            token: SecretString::from("token-123".to_string()),
            balance: Some(Price::new(5000)),
            scope_id: Uuid::nil(),
        }
    }

    fn context() -> SessionContext {
        let store = Arc::new(MemoryStore::default());
        SessionContext::new(Session::new(None, store, None))
    }

    #[test]
    fn test_current_user_debug_redacts_token() {
        let debug = format!("{:?}", user());
        assert!(debug.contains("crio.do"));
        assert!(!debug.contains("token-123"));
    }

    #[test]
    fn test_current_user_session_codec_keeps_token() {
        let json = serde_json::to_value(user()).unwrap();
        assert_eq!(json["token"], "token-123");

        let decoded: CurrentUser = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.token.expose_secret(), "token-123");
        assert_eq!(decoded.balance, Some(Price::new(5000)));
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let ctx = context();
        assert!(ctx.current_user().await.unwrap().is_none());

        ctx.sign_in(&user()).await.unwrap();
        let current = ctx.current_user().await.unwrap().unwrap();
        assert_eq!(current.username, "crio.do");

        let signed_out = ctx.sign_out().await.unwrap();
        assert_eq!(signed_out.unwrap().username, "crio.do");
        assert!(ctx.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_balance() {
        let ctx = context();
        ctx.set_balance(Some(Price::new(1))).await.unwrap();
        assert!(ctx.current_user().await.unwrap().is_none());

        ctx.sign_in(&user()).await.unwrap();
        ctx.set_balance(None).await.unwrap();
        assert_eq!(ctx.current_user().await.unwrap().unwrap().balance, None);
    }

    #[tokio::test]
    async fn test_notifications_are_drained_once() {
        let ctx = context();
        ctx.notify(Level::Warning, "Item already in cart.")
            .await
            .unwrap();
        ctx.notify(Level::Success, "Logged in successfully")
            .await
            .unwrap();

        let pending = ctx.take_notifications().await.unwrap();
        assert_eq!(
            pending,
            vec![
                Notification::warning("Item already in cart."),
                Notification::success("Logged in successfully"),
            ]
        );
        assert!(ctx.take_notifications().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notifications_survive_sign_out() {
        let ctx = context();
        ctx.sign_in(&user()).await.unwrap();
        ctx.notify(Level::Info, "bye").await.unwrap();
        ctx.sign_out().await.unwrap();
        assert_eq!(ctx.take_notifications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_key_is_stable() {
        let ctx = context();
        let first = ctx.key().await.unwrap();
        let second = ctx.key().await.unwrap();
        assert_eq!(first, second);
    }
}

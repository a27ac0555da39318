//! Authentication route handlers.
//!
//! Handles login, registration, and logout against the QKart backend.
//! Every action redirects (Post/Redirect/Get); outcomes are reported through
//! flash notifications.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use qkart_core::validation::{validate_login, validate_registration};

use super::Layout;
use crate::backend::BackendError;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::models::{CurrentUser, Level, SessionContext};
use crate::state::AppState;

/// Shown after a successful login.
pub const LOGGED_IN: &str = "Logged in successfully";

/// Shown after a successful registration.
pub const REGISTERED: &str = "Registration successful";

/// Fallback when the backend refuses a login without a message.
pub const LOGIN_FAILED: &str = "Login Failed";

/// Fallback when the backend refuses a registration without a message.
pub const REGISTRATION_FAILED: &str = "Registration failed";

/// Shown when the backend can't be reached during login.
pub const LOGIN_UNREACHABLE: &str = "No response from server, Please try again later";

/// Shown when the backend can't be reached during registration.
pub const REGISTER_UNREACHABLE: &str = "No response from server. Please try again later.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
}

/// Pick the notification for a failed auth call.
fn failure_message(error: &BackendError, unreachable: &str, fallback: &str) -> String {
    if error.is_unreachable() {
        unreachable.to_string()
    } else {
        error.user_message(fallback)
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(ctx: SessionContext) -> Result<LoginTemplate, AppError> {
    Ok(LoginTemplate {
        layout: Layout::for_auth_page(&ctx).await?,
    })
}

/// Handle login form submission.
///
/// Stores the token, username and balance in the session and opens a new
/// lifecycle scope for this login.
#[instrument(skip(state, ctx, form))]
pub async fn login(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    let credentials = match validate_login(&form.username, &form.password) {
        Ok(credentials) => credentials,
        Err(e) => {
            ctx.notify(Level::Warning, e.to_string()).await?;
            return Ok(Redirect::to("/auth/login"));
        }
    };
    let password = SecretString::from(credentials.password);

    let response = match state
        .backend()
        .login(credentials.username.as_str(), &password)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            ctx.notify(
                Level::Error,
                failure_message(&e, LOGIN_UNREACHABLE, LOGIN_FAILED),
            )
            .await?;
            return Ok(Redirect::to("/auth/login"));
        }
    };

    // A second login in the same browser replaces the first
    if let Some(previous) = ctx.current_user().await? {
        state.lifecycles().end(previous.scope_id);
    }

    let user = CurrentUser {
        username: response.username,
        token: response.token,
        balance: Some(response.balance),
        scope_id: state.lifecycles().begin(),
    };
    ctx.sign_in(&user).await?;
    set_sentry_user(&user.username);
    tracing::info!(username = %user.username, "Signed in");

    ctx.notify(Level::Success, LOGGED_IN).await?;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(ctx: SessionContext) -> Result<RegisterTemplate, AppError> {
    Ok(RegisterTemplate {
        layout: Layout::for_auth_page(&ctx).await?,
    })
}

/// Handle registration form submission.
#[instrument(skip(state, ctx, form))]
pub async fn register(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    let credentials =
        match validate_registration(&form.username, &form.password, &form.confirm_password) {
            Ok(credentials) => credentials,
            Err(e) => {
                ctx.notify(Level::Warning, e.to_string()).await?;
                return Ok(Redirect::to("/auth/register"));
            }
        };
    let password = SecretString::from(credentials.password);

    match state
        .backend()
        .register(credentials.username.as_str(), &password)
        .await
    {
        Ok(()) => {
            tracing::info!(username = %credentials.username, "Registered");
            ctx.notify(Level::Success, REGISTERED).await?;
            Ok(Redirect::to("/auth/login"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            ctx.notify(
                Level::Error,
                failure_message(&e, REGISTER_UNREACHABLE, REGISTRATION_FAILED),
            )
            .await?;
            Ok(Redirect::to("/auth/register"))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// Cancels anything still running for this login before the session forgets
/// it.
#[instrument(skip(state, ctx))]
pub async fn logout(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Redirect, AppError> {
    if let Some(user) = ctx.sign_out().await? {
        state.lifecycles().end(user.scope_id);
        tracing::info!(username = %user.username, "Signed out");
    }
    clear_sentry_user();

    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn test_failure_message_prefers_server_text() {
        let err = BackendError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: Some("Username is already taken".to_string()),
        };
        assert_eq!(
            failure_message(&err, REGISTER_UNREACHABLE, REGISTRATION_FAILED),
            "Username is already taken"
        );
    }

    #[test]
    fn test_failure_message_fallback() {
        let err = BackendError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            message: None,
        };
        assert_eq!(
            failure_message(&err, LOGIN_UNREACHABLE, LOGIN_FAILED),
            LOGIN_FAILED
        );
    }
}

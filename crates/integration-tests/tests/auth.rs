//! Login, registration and logout flows.

use qkart_integration_tests::{FakeBackend, PASSWORD, TestContext, USERNAME};
use reqwest::StatusCode;

#[tokio::test]
async fn test_login_lands_on_catalog_with_username() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.login().await;

    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.path, "/");
    assert!(page.body.contains("Logged in successfully"));
    assert!(page.body.contains(USERNAME));
    assert!(page.body.contains("/auth/logout"));
}

#[tokio::test]
async fn test_login_notification_is_shown_once() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;
    ctx.login().await;

    let page = ctx.get("/").await;
    assert!(!page.body.contains("Logged in successfully"));
}

#[tokio::test]
async fn test_login_wrong_password_shows_server_message() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx
        .post(
            "/auth/login",
            &[("username", USERNAME), ("password", "wrong-password")],
        )
        .await;

    assert_eq!(page.path, "/auth/login");
    assert!(page.body.contains("Password is incorrect"));
    assert!(!page.body.contains("/auth/logout"));
}

#[tokio::test]
async fn test_login_blank_fields_never_reach_backend() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx
        .post("/auth/login", &[("username", ""), ("password", PASSWORD)])
        .await;
    assert!(page.body.contains("Username is a required field"));

    let page = ctx
        .post("/auth/login", &[("username", USERNAME), ("password", "")])
        .await;
    assert!(page.body.contains("Password is a required field"));
}

#[tokio::test]
async fn test_register_success_redirects_to_login() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx
        .post(
            "/auth/register",
            &[
                ("username", "new.shopper"),
                ("password", "secret123"),
                ("confirm_password", "secret123"),
            ],
        )
        .await;

    assert_eq!(page.path, "/auth/login");
    assert!(page.body.contains("Registration successful"));
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx
        .post(
            "/auth/register",
            &[
                ("username", "new.shopper"),
                ("password", "secret123"),
                ("confirm_password", "secret124"),
            ],
        )
        .await;

    assert_eq!(page.path, "/auth/register");
    assert!(page.body.contains("Passwords do not match"));
}

#[tokio::test]
async fn test_register_taken_username() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx
        .post(
            "/auth/register",
            &[
                ("username", USERNAME),
                ("password", "secret123"),
                ("confirm_password", "secret123"),
            ],
        )
        .await;

    assert_eq!(page.path, "/auth/register");
    assert!(page.body.contains("Username is already taken"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;
    ctx.login().await;

    let page = ctx.post("/auth/logout", &[]).await;

    assert_eq!(page.path, "/");
    assert!(page.body.contains("/auth/login"));
    assert!(!page.body.contains("/auth/logout"));

    let page = ctx.get("/checkout").await;
    assert_eq!(page.path, "/");
    assert!(page.body.contains("You must be logged in to access checkout page"));
}

#[tokio::test]
async fn test_auth_pages_show_back_to_explore() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.get("/auth/register").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Back to explore"));
    assert!(page.body.contains("confirm_password"));
}

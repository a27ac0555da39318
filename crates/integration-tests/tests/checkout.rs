//! Address management and order placement.

use std::time::Duration;

use qkart_integration_tests::{FakeBackend, TestContext, product};

const ADDRESS: &str = "221B Baker Street, Marylebone, London";

/// Backend holding one address and a 300 cart.
fn stocked(balance: i64) -> (FakeBackend, String) {
    let backend = FakeBackend::with_catalog();
    backend.data().balance = balance;
    backend.put_in_cart("watch", 1);
    let address = backend.add_address(ADDRESS);
    (backend, address.as_str().to_string())
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.get("/checkout").await;

    assert_eq!(page.path, "/");
    assert!(page.body.contains("You must be logged in to access checkout page"));
}

#[tokio::test]
async fn test_checkout_page_lists_addresses_and_summary() {
    let (backend, _) = stocked(500);
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let page = ctx.get("/checkout").await;

    assert!(page.body.contains(ADDRESS));
    assert!(page.body.contains("Qty: 1"));
    assert!(page.body.contains(r#"data-testid="cart-count">1<"#));
    assert!(page.body.contains("Pay $300 of available $500"));
}

#[tokio::test]
async fn test_place_order_success() {
    let (backend, address_id) = stocked(500);
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let page = ctx
        .post("/checkout/place", &[("address_id", address_id.as_str())])
        .await;

    assert_eq!(page.path, "/thanks");
    assert!(page.body.contains("Order placed successfully!"));
    assert!(page.body.contains("$200"));

    let data = ctx.backend.data();
    assert_eq!(data.checkout_calls, 1);
    assert_eq!(data.balance, 200);
    assert!(data.cart.is_empty());
}

#[tokio::test]
async fn test_place_order_insufficient_balance_skips_backend() {
    let (backend, address_id) = stocked(100);
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let page = ctx
        .post("/checkout/place", &[("address_id", address_id.as_str())])
        .await;

    assert_eq!(page.path, "/checkout");
    assert!(page.body.contains("You do not have enough balance in your wallet for this purchase"));
    assert_eq!(ctx.backend.data().checkout_calls, 0);
}

#[tokio::test]
async fn test_place_order_without_addresses() {
    let backend = FakeBackend::with_catalog();
    backend.put_in_cart("shoes", 1);
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let page = ctx.post("/checkout/place", &[]).await;

    assert!(page.body.contains("Please add a new address before proceeding."));
    assert!(page.body.contains("No addresses found for this account"));
    assert_eq!(ctx.backend.data().checkout_calls, 0);
}

#[tokio::test]
async fn test_place_order_without_selection() {
    let (backend, _) = stocked(500);
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let page = ctx.post("/checkout/place", &[]).await;

    assert!(page.body.contains("Please select one shipping address to proceed."));
    assert_eq!(ctx.backend.data().checkout_calls, 0);
}

#[tokio::test]
async fn test_unreported_balance_becomes_unconfirmed() {
    let (backend, address_id) = stocked(500);
    backend.data().hide_checkout_balance = true;
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let page = ctx
        .post("/checkout/place", &[("address_id", address_id.as_str())])
        .await;
    assert_eq!(page.path, "/thanks");
    assert!(page.body.contains("will be updated shortly"));

    // With no confirmed balance the local check is skipped and the backend decides
    ctx.backend.put_in_cart("watch", 1);
    let page = ctx.get("/checkout").await;
    assert!(page.body.contains("balance (unconfirmed)"));
}

#[tokio::test]
async fn test_add_and_delete_address() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;
    ctx.login().await;

    let page = ctx
        .post("/checkout/addresses", &[("address", ADDRESS)])
        .await;
    assert_eq!(page.path, "/checkout");
    assert!(page.body.contains(ADDRESS));

    let id = ctx.backend.data().addresses[0].id.as_str().to_string();
    let page = ctx
        .post(&format!("/checkout/addresses/{id}/delete"), &[])
        .await;
    assert!(!page.body.contains(ADDRESS));
    assert!(ctx.backend.data().addresses.is_empty());
}

#[tokio::test]
async fn test_add_blank_address_is_rejected_locally() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;
    ctx.login().await;

    let page = ctx.post("/checkout/addresses", &[("address", "   ")]).await;

    assert!(page.body.contains("Address cannot be empty"));
    assert!(ctx.backend.data().addresses.is_empty());
}

#[tokio::test]
async fn test_add_short_address_shows_server_message() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;
    ctx.login().await;

    let page = ctx.post("/checkout/addresses", &[("address", "Too short")]).await;

    assert!(page.body.contains("length must be at least 20 characters long"));
}

#[tokio::test]
async fn test_product_newer_than_cached_catalog_counts_toward_total() {
    let (backend, address_id) = stocked(500);
    let ctx = TestContext::start(backend).await;
    // Landing on the catalog caches it without the sofa
    ctx.login().await;

    ctx.backend
        .data()
        .products
        .push(product("sofa", "Three Seater Sofa", 9000));
    ctx.backend.put_in_cart("sofa", 1);

    let page = ctx.get("/checkout").await;
    assert!(page.body.contains("Three Seater Sofa"));
    assert!(page.body.contains("Pay $9300 of available $500"));

    let page = ctx
        .post("/checkout/place", &[("address_id", address_id.as_str())])
        .await;
    assert!(page.body.contains("You do not have enough balance in your wallet for this purchase"));
    assert_eq!(ctx.backend.data().checkout_calls, 0);
}

#[tokio::test]
async fn test_logout_while_checkout_loads_discards_order() {
    let (backend, address_id) = stocked(500);
    backend.data().addresses_delay = Duration::from_millis(400);
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let form = [("address_id", address_id.as_str())];
    let place = ctx.post("/checkout/place", &form);
    let logout = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctx.post("/auth/logout", &[]).await
    };
    let (placed, _) = tokio::join!(place, logout);

    assert_eq!(placed.path, "/");
    assert!(!placed.body.contains("Order placed successfully!"));

    let page = ctx.get("/").await;
    assert!(page.body.contains("/auth/login"));
    assert!(!page.body.contains("/auth/logout"));

    let data = ctx.backend.data();
    assert_eq!(data.checkout_calls, 0);
    assert_eq!(data.balance, 500);
}

#[tokio::test]
async fn test_logout_while_order_in_flight_keeps_session_signed_out() {
    let (backend, address_id) = stocked(500);
    backend.data().checkout_delay = Duration::from_millis(400);
    let ctx = TestContext::start(backend).await;
    ctx.login().await;

    let form = [("address_id", address_id.as_str())];
    let place = ctx.post("/checkout/place", &form);
    let logout = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctx.post("/auth/logout", &[]).await
    };
    let (placed, _) = tokio::join!(place, logout);

    assert_eq!(placed.path, "/");
    assert!(!placed.body.contains("/auth/logout"));

    let page = ctx.get("/thanks").await;
    assert_eq!(page.path, "/");
    assert!(page.body.contains("You must be logged in to access checkout page"));
}

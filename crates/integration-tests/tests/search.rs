//! Product search, both the full-page form and the live fragment.

use std::time::Duration;

use qkart_integration_tests::{FakeBackend, TestContext};
use reqwest::StatusCode;

#[tokio::test]
async fn test_catalog_lists_all_products() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.get("/").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Tan Leatherette Weekender Duffle"));
    assert!(page.body.contains("Black Running Shoes"));
    assert!(page.body.contains("Smart Fitness Watch"));
    assert!(page.body.contains("★★★★☆"));
}

#[tokio::test]
async fn test_catalog_is_cached() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    ctx.get("/").await;
    ctx.get("/").await;

    assert_eq!(ctx.backend.data().product_calls, 1);
}

#[tokio::test]
async fn test_search_fragment_filters_products() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.get("/products/search?value=watch").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Smart Fitness Watch"));
    assert!(!page.body.contains("Black Running Shoes"));
    assert!(!page.body.contains("<html"));
}

#[tokio::test]
async fn test_search_without_match_then_blank_restores_catalog() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.get("/products/search?value=spaceship").await;
    assert!(page.body.contains("Product Is Not Available."));
    assert!(!page.body.contains("Smart Fitness Watch"));

    let page = ctx.get("/products/search?value=").await;
    assert!(page.body.contains("Smart Fitness Watch"));
    assert!(page.body.contains("Black Running Shoes"));
}

#[tokio::test]
async fn test_full_page_search_keeps_term() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.get("/?value=duffle").await;

    assert!(page.body.contains("Tan Leatherette Weekender Duffle"));
    assert!(!page.body.contains("Smart Fitness Watch"));
    assert!(page.body.contains(r#"value="duffle""#));
}

#[tokio::test]
async fn test_superseded_search_returns_no_content() {
    let ctx =
        TestContext::start_with_debounce(FakeBackend::with_catalog(), Duration::from_millis(300))
            .await;

    // Establish the session cookie so both requests share one debounce key
    ctx.get("/products/search?value=").await;

    let first = ctx.client.get(format!("{}/products/search?value=sh", ctx.base_url)).send();
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.client
            .get(format!("{}/products/search?value=shoes", ctx.base_url))
            .send()
            .await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.expect("first search").status(), StatusCode::NO_CONTENT);
    let second = second.expect("second search");
    assert_eq!(second.status(), StatusCode::OK);
    assert!(second.text().await.expect("body").contains("Black Running Shoes"));
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::start(FakeBackend::with_catalog()).await;

    let page = ctx.get("/health").await;

    assert_eq!(page.status, StatusCode::OK);
}

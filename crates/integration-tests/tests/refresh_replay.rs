//! 401 handling: single-flight refresh, replay and session termination.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chinchin_client::{ApiError, CollectionKind, KeyValueStore, Notification, Signal, StorageKey};
use chinchin_core::EntityId;
use chinchin_integration_tests::{TestContext, drain};
use futures::future::join_all;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

const CONCURRENT_REQUESTS: usize = 5;

async fn mount_products(ctx: &TestContext, token: &str, status: u16, expected: u64) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": 1, "name": "Rose box", "price": 350000},
                {"id": 2, "name": "Tulip vase", "price": 520000}
            ]
        }))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path(TestContext::api_path("products")))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(response)
        .expect(expected)
        .mount(&ctx.server)
        .await;
}

// ============================================================================
// Successful refresh
// ============================================================================

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let ctx = TestContext::new().await;
    ctx.sign_in("expired", Some("refresh-1"));

    mount_products(&ctx, "expired", 401, CONCURRENT_REQUESTS as u64).await;
    mount_products(&ctx, "fresh", 200, CONCURRENT_REQUESTS as u64).await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("auth/refresh")))
        .and(body_json(json!({"accessToken": "expired", "refreshToken": "refresh-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "fresh", "refreshToken": "refresh-2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let client = &ctx.client;
    let results = join_all(
        (0..CONCURRENT_REQUESTS).map(|_| async move { client.products().get_all().await }),
    )
    .await;

    for result in results {
        assert_eq!(result.unwrap().len(), 2);
    }
    assert_eq!(ctx.get(StorageKey::AccessToken).as_deref(), Some("fresh"));
    assert_eq!(
        ctx.get(StorageKey::RefreshToken).as_deref(),
        Some("refresh-2")
    );
}

#[tokio::test]
async fn test_refresh_and_replay_overwrites_cache() {
    let ctx = TestContext::new().await;
    ctx.sign_in("expired", Some("refresh-1"));
    let old_stamp = (chrono::Utc::now() - chrono::TimeDelta::days(1))
        .timestamp_millis()
        .to_string();
    ctx.store
        .set_all(&[
            (
                StorageKey::Collection(CollectionKind::Products),
                r#"[{"id": 9, "name": "Old", "price": 1}]"#,
            ),
            (StorageKey::CacheUpdatedAt, &old_stamp),
        ])
        .unwrap();

    mount_products(&ctx, "expired", 401, 1).await;
    mount_products(&ctx, "fresh", 200, 1).await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("auth/refresh")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products().get_all().await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(
        ctx.cached(CollectionKind::Products).unwrap(),
        json!([
            {"id": 1, "name": "Rose box", "price": 350000},
            {"id": 2, "name": "Tulip vase", "price": 520000}
        ])
    );
    let new_stamp: i64 = ctx.get(StorageKey::CacheUpdatedAt).unwrap().parse().unwrap();
    assert!(new_stamp > old_stamp.parse::<i64>().unwrap());
    assert_eq!(
        ctx.get(StorageKey::RefreshToken).as_deref(),
        Some("refresh-1")
    );
}

// ============================================================================
// Failed refresh
// ============================================================================

#[tokio::test]
async fn test_revoked_refresh_token_ends_session_once() {
    let ctx = TestContext::new().await;
    ctx.sign_in("expired", Some("revoked"));
    let mut signals = ctx.client.signals().subscribe();

    mount_products(&ctx, "expired", 401, 3).await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("auth/refresh")))
        .respond_with(ResponseTemplate::new(400).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let client = &ctx.client;
    let results = join_all((0..3).map(|_| async move { client.products().get_all().await })).await;

    for result in results {
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }
    assert!(ctx.credentials_cleared());

    let published = drain(&mut signals);
    let reauth = published
        .iter()
        .filter(|s| **s == Signal::ReauthenticateRequired)
        .count();
    assert_eq!(reauth, 1);
    assert!(published.iter().any(|s| matches!(
        s,
        Signal::Notify(Notification { message, .. }) if message.contains("session has expired")
    )));
}

#[tokio::test]
async fn test_missing_refresh_token_skips_network() {
    let ctx = TestContext::new().await;
    ctx.sign_in("expired", None);
    let mut signals = ctx.client.signals().subscribe();

    mount_products(&ctx, "expired", 401, 1).await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("auth/refresh")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let result = ctx.client.products().get_all().await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(ctx.credentials_cleared());

    // What a signal consumer does on re-authentication must not repeat the notice.
    ctx.client.session().handle_reauthentication().unwrap();
    let published = drain(&mut signals);
    assert!(published.contains(&Signal::ReauthenticateRequired));
    let expired_notices = published
        .iter()
        .filter(|s| {
            matches!(
                s,
                Signal::Notify(Notification { message, .. }) if message.contains("session has expired")
            )
        })
        .count();
    assert_eq!(expired_notices, 1);
}

// ============================================================================
// Replay limits
// ============================================================================

#[tokio::test]
async fn test_second_401_is_not_retried() {
    let ctx = TestContext::new().await;
    ctx.sign_in("expired", Some("refresh-1"));

    mount_products(&ctx, "expired", 401, 1).await;
    mount_products(&ctx, "also-rejected", 401, 1).await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("auth/refresh")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "also-rejected"})))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let result = ctx.client.products().get_all().await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(
        ctx.get(StorageKey::AccessToken).as_deref(),
        Some("also-rejected")
    );
}

#[tokio::test]
async fn test_anonymous_401_does_not_refresh() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path(TestContext::api_path("posts")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("auth/refresh")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let result = ctx.client.posts().get_all().await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_replay_resends_body_and_method() {
    let ctx = TestContext::new().await;
    ctx.sign_in("expired", Some("refresh-1"));

    Mock::given(method("PUT"))
        .and(path(TestContext::api_path("productCategories/4")))
        .and(header("Authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("PUT"))
        .and(path(TestContext::api_path("productCategories/4")))
        .and(header("Authorization", "Bearer fresh"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"name": "Orchids"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 4, "name": "Orchids"})),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(TestContext::api_path("auth/refresh")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "fresh"})))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let updated = ctx
        .client
        .categories()
        .update(&EntityId::Number(4), &json!({"name": "Orchids"}))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.name, "Orchids");
}

mod common;

use std::sync::Arc;

use mockito::{Matcher, Server};
use serde_json::json;

use common::{http_context, memory_storage, mint_token, seed_tokens};
use tradebit_client::errors::SignInError;
use tradebit_client::models::{Session, User};
use tradebit_client::storage::FileStorage;

#[tokio::test]
async fn test_sign_in_then_restore_without_network() {
    let mut server = Server::new_async().await;
    let access = mint_token(7, "asha", 3600);
    let token_mock = server
        .mock("POST", "/token/")
        .match_body(Matcher::Json(json!({"username": "asha", "password": "secret"})))
        .with_status(200)
        .with_body(json!({"access": access, "refresh": "refresh-1"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let refresh_mock = server
        .mock("POST", "/token/refresh/")
        .expect(0)
        .create_async()
        .await;

    let storage = memory_storage();
    let ctx = http_context(&server.url(), storage.clone());
    let session = ctx.sign_in("asha", "secret").await.unwrap();
    assert_eq!(session, Session::Authenticated(Some(User::new("7", "asha"))));

    // A fresh start over the same storage restores the session from the live token.
    let restarted = http_context(&server.url(), storage);
    assert!(!restarted.session.is_authenticated().await);
    assert!(restarted.session.reconcile().await);
    assert_eq!(
        restarted.session.current_user().await.map(|u| u.username),
        Some("asha".to_string())
    );

    token_mock.assert_async().await;
    refresh_mock.assert_async().await;
}

#[tokio::test]
async fn test_sign_in_over_stale_pair_sends_no_bearer() {
    let mut server = Server::new_async().await;
    let access = mint_token(7, "asha", 3600);
    let token_mock = server
        .mock("POST", "/token/")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(json!({"access": access, "refresh": "refresh-2"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let refresh_mock = server
        .mock("POST", "/token/refresh/")
        .expect(0)
        .create_async()
        .await;

    let ctx = http_context(&server.url(), memory_storage());
    seed_tokens(&ctx, &mint_token(7, "asha", -3600), "revoked").await;

    let session = ctx.sign_in("asha", "secret").await.unwrap();
    assert!(session.is_authenticated());
    assert_eq!(
        ctx.session.tokens().refresh_token().await.unwrap().as_deref(),
        Some("refresh-2")
    );
    token_mock.assert_async().await;
    refresh_mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_sign_in_leaves_session_logged_out() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/token/")
        .with_status(401)
        .with_body(r#"{"detail": "No active account found with the given credentials"}"#)
        .create_async()
        .await;

    let ctx = http_context(&server.url(), memory_storage());
    let err = ctx.sign_in("asha", "wrong").await.unwrap_err();
    match err {
        SignInError::Gateway(e) => assert!(e.is_unauthorized()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ctx.session.session().await, Session::LoggedOut);
    assert_eq!(ctx.session.tokens().load().await.unwrap(), None);
}

#[tokio::test]
async fn test_reconcile_refreshes_expired_token() {
    let mut server = Server::new_async().await;
    let expired = mint_token(7, "asha", -3600);
    let fresh = mint_token(7, "asha.rao", 3600);
    let refresh_mock = server
        .mock("POST", "/token/refresh/")
        .match_body(Matcher::Json(json!({"refresh": "refresh-1"})))
        .with_status(200)
        .with_body(json!({"access": fresh}).to_string())
        .expect(1)
        .create_async()
        .await;

    let ctx = http_context(&server.url(), memory_storage());
    seed_tokens(&ctx, &expired, "refresh-1").await;

    assert!(ctx.session.reconcile().await);
    refresh_mock.assert_async().await;

    // The session reflects the claims of the refreshed token.
    assert_eq!(
        ctx.session.current_user().await,
        Some(User::new("7", "asha.rao"))
    );
    assert_eq!(
        ctx.session.tokens().access_token().await.unwrap().as_deref(),
        Some(fresh.as_str())
    );
    assert_eq!(
        ctx.session.tokens().refresh_token().await.unwrap().as_deref(),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn test_reconcile_logs_out_when_refresh_is_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/token/refresh/")
        .with_status(401)
        .with_body(r#"{"detail": "Token is blacklisted"}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = http_context(&server.url(), memory_storage());
    seed_tokens(&ctx, &mint_token(7, "asha", -60), "revoked").await;

    assert!(!ctx.session.reconcile().await);
    assert_eq!(ctx.session.session().await, Session::LoggedOut);
    assert_eq!(ctx.session.tokens().load().await.unwrap(), None);
}

#[tokio::test]
async fn test_reconcile_without_tokens_is_logged_out() {
    let server = Server::new_async().await;
    let ctx = http_context(&server.url(), memory_storage());
    assert!(!ctx.session.reconcile().await);
    assert_eq!(ctx.session.session().await, Session::LoggedOut);
}

#[tokio::test]
async fn test_logout_forgets_persisted_pair() {
    let server = Server::new_async().await;
    let storage = memory_storage();
    let ctx = http_context(&server.url(), storage.clone());
    ctx.session
        .login(&mint_token(7, "asha", 3600), "refresh-1")
        .await
        .unwrap();
    assert!(ctx.session.is_authenticated().await);

    ctx.session.logout().await.unwrap();
    ctx.session.logout().await.unwrap();

    assert!(storage.is_empty().await);
    let restarted = http_context(&server.url(), storage);
    assert!(!restarted.session.reconcile().await);
}

#[tokio::test]
async fn test_file_storage_survives_restart() {
    let server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let ctx = http_context(&server.url(), Arc::new(FileStorage::new(&path)));
    ctx.session
        .login(&mint_token(3, "ravi", 3600), "refresh-3")
        .await
        .unwrap();

    let restarted = http_context(&server.url(), Arc::new(FileStorage::new(&path)));
    assert!(restarted.session.reconcile().await);
    assert_eq!(
        restarted.session.current_user().await,
        Some(User::new("3", "ravi"))
    );
}

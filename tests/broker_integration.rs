mod common;

use mockito::{Matcher, Server, ServerGuard};

use common::{http_context, memory_storage, mint_token};
use tradebit_client::api::SyncSummary;
use tradebit_client::broker::{BrokerLinkState, Navigator};
use tradebit_client::errors::BrokerLinkError;
use tradebit_client::state::AppContext;

const CALLBACK_URL: &str = "http://localhost:3000/zerodha?request_token=tok123&status=success";

async fn signed_in(server: &ServerGuard) -> AppContext {
    let ctx = http_context(&server.url(), memory_storage());
    ctx.session
        .login(&mint_token(7, "asha", 3600), "refresh-1")
        .await
        .unwrap();
    ctx
}

#[tokio::test]
async fn test_callback_token_is_exchanged_exactly_once() {
    let mut server = Server::new_async().await;
    let callback = server
        .mock("GET", "/zerodha/callback/")
        .match_query(Matcher::UrlEncoded("request_token".into(), "tok123".into()))
        .with_status(200)
        .with_body(r#"{"message": "Zerodha account linked"}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = signed_in(&server).await;
    let page = ctx.link_page(Some(CALLBACK_URL)).unwrap();
    let mut flow = ctx.broker_link_flow(page.clone());

    assert!(flow.handle_callback().await.unwrap());
    assert_eq!(flow.state(), &BrokerLinkState::Linked);
    assert_eq!(
        page.current_url().as_str(),
        "http://localhost:3000/zerodha?status=success"
    );

    // Running the handler again on the same page finds nothing to submit.
    assert!(!flow.handle_callback().await.unwrap());

    // Nor does a reload, which starts a new flow at the stripped location.
    let reloaded = ctx.link_page(Some(page.current_url().as_str())).unwrap();
    let mut after_reload = ctx.broker_link_flow(reloaded);
    assert!(!after_reload.handle_callback().await.unwrap());
    assert_eq!(after_reload.state(), &BrokerLinkState::Idle);

    callback.assert_async().await;
}

#[tokio::test]
async fn test_failed_callback_reports_backend_reason_and_strips_token() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/zerodha/callback/")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error": "Token is invalid or has expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = signed_in(&server).await;
    let page = ctx.link_page(Some(CALLBACK_URL)).unwrap();
    let mut flow = ctx.broker_link_flow(page.clone());

    let err = flow.handle_callback().await.unwrap_err();
    assert_eq!(
        err,
        BrokerLinkError::Failed("Token is invalid or has expired".into())
    );
    assert_eq!(
        flow.state(),
        &BrokerLinkState::Failed("Token is invalid or has expired".into())
    );
    assert!(!page.current_url().as_str().contains("request_token"));
    assert!(ctx.session.is_authenticated().await);
}

#[tokio::test]
async fn test_start_login_navigates_to_brokerage() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/zerodha/login/")
        .with_status(200)
        .with_body(r#"{"login_url": "https://kite.zerodha.com/connect/login?v=3&api_key=abc"}"#)
        .create_async()
        .await;

    let ctx = signed_in(&server).await;
    let page = ctx.link_page(None).unwrap();
    let mut flow = ctx.broker_link_flow(page.clone());

    let login_url = flow.start_login().await.unwrap();
    assert_eq!(login_url.host_str(), Some("kite.zerodha.com"));
    assert_eq!(page.assigned(), vec![login_url]);
    assert_eq!(flow.state(), &BrokerLinkState::AwaitingExternalRedirect);
}

#[tokio::test]
async fn test_start_login_failure_without_reason_uses_generic_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/zerodha/login/")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let ctx = signed_in(&server).await;
    let page = ctx.link_page(None).unwrap();
    let mut flow = ctx.broker_link_flow(page.clone());

    match flow.start_login().await.unwrap_err() {
        BrokerLinkError::Failed(reason) => assert!(reason.starts_with("Failed to get Zerodha login URL")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(page.assigned().is_empty());
    assert!(matches!(flow.state(), BrokerLinkState::Failed(_)));
}

#[tokio::test]
async fn test_sync_holdings_from_fresh_page() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/zerodha/sync-holdings/")
        .with_status(200)
        .with_body(r#"{"created": 4, "updated": 2, "total": 6}"#)
        .expect(1)
        .create_async()
        .await;

    let ctx = signed_in(&server).await;
    let flow = ctx.broker_link_flow(ctx.link_page(None).unwrap());

    let summary = flow.sync_holdings().await.unwrap();
    assert_eq!(
        summary,
        SyncSummary {
            created: 4,
            updated: 2,
            total: 6
        }
    );
    assert_eq!(summary.to_string(), "Created: 4, Updated: 2, Total: 6");
    assert_eq!(flow.state(), &BrokerLinkState::Idle);
}

#[tokio::test]
async fn test_sync_failure_reads_message_field() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/zerodha/sync-holdings/")
        .with_status(400)
        .with_body(r#"{"message": "Zerodha session expired. Please re-link."}"#)
        .create_async()
        .await;

    let ctx = signed_in(&server).await;
    let flow = ctx.broker_link_flow(ctx.link_page(None).unwrap());

    assert_eq!(
        flow.sync_holdings().await.unwrap_err(),
        BrokerLinkError::Failed("Zerodha session expired. Please re-link.".into())
    );
    assert_eq!(flow.state(), &BrokerLinkState::Idle);
}

#[tokio::test]
async fn test_sync_is_refused_after_failed_link() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/zerodha/callback/")
        .match_query(Matcher::Any)
        .with_status(400)
        .create_async()
        .await;
    let sync = server
        .mock("POST", "/zerodha/sync-holdings/")
        .expect(0)
        .create_async()
        .await;

    let ctx = signed_in(&server).await;
    let mut flow = ctx.broker_link_flow(ctx.link_page(Some(CALLBACK_URL)).unwrap());
    let err = flow.handle_callback().await.unwrap_err();
    assert_eq!(
        err,
        BrokerLinkError::Failed("Failed to authenticate with Zerodha. Please try again.".into())
    );

    assert!(matches!(
        flow.sync_holdings().await,
        Err(BrokerLinkError::InvalidState(BrokerLinkState::Failed(_)))
    ));
    sync.assert_async().await;
}

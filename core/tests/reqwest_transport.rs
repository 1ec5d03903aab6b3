//! `ReqwestTransport` against the live mock server.

#![cfg(feature = "reqwest")]

use std::net::SocketAddr;

use pasty_client::{ApiError, ClientConfig, Credentials, PastyApiClient, ReqwestTransport};

async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(
        listener,
        mock_server::seeded(&[("alice", "wonderland")]),
    ));
    addr
}

fn client_for(addr: SocketAddr) -> PastyApiClient<ReqwestTransport> {
    let config = ClientConfig::new("127.0.0.1", addr.port()).with_credentials("alice", "wonderland");
    PastyApiClient::new(config, ReqwestTransport::new(reqwest::Client::new())).unwrap()
}

#[tokio::test]
async fn items_round_trip_over_reqwest() {
    let client = client_for(start_server().await);
    let me = Credentials::Default;

    let version = client.get_server_version().await.unwrap();
    assert_eq!(version["version"], "2.1.0");

    let id = client.add_item("sent by reqwest", &me).await.unwrap();
    let item = client.get_item(&id, &me).await.unwrap();
    assert_eq!(item.text(), Some("sent by reqwest"));

    client.delete_item(&id, &me).await.unwrap();
    let err = client.get_item(&id, &me).await.unwrap_err();
    let ApiError::Server(info) = &err else {
        panic!("expected server error, got {err:?}");
    };
    assert_eq!(info.status_code, Some(404));
}

#[tokio::test]
async fn reqwest_passes_token_and_reports_bad_login() {
    let addr = start_server().await;
    let client = client_for(addr);

    let token = client.request_token("alice", "wonderland").await.unwrap();
    let value = token.get("token").and_then(|v| v.as_str()).unwrap().to_string();
    assert!(client.list_items(&Credentials::token(&value)).await.unwrap().is_empty());

    let err = client
        .list_items(&Credentials::basic("alice", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn reqwest_connection_refused_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = client_for(addr).get_server_version().await.unwrap_err();
    let ApiError::Transport(info) = &err else {
        panic!("expected transport error, got {err:?}");
    };
    assert_eq!(info.status_code, Some(0));
}

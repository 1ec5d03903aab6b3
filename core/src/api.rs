//! Asynchronous Pasty API client.
//!
//! # Design
//! `PastyApiClient` pairs a `PastyClient` with an injected `Transport`. Each
//! public method builds its request, awaits exactly one exchange, and parses
//! the response, so every call resolves exactly once to `Ok` or `Err`.
//! Argument problems are reported before the transport is touched. The only
//! mutable state is the most recently issued session token.

use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use crate::auth::Credentials;
use crate::client::{transport_failure, PastyClient};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{ClipboardItem, SessionToken};

pub struct PastyApiClient<T> {
    client: PastyClient,
    transport: T,
    session_token: RwLock<Option<SessionToken>>,
}

impl<T: Transport> PastyApiClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        Ok(Self {
            client: PastyClient::new(config)?,
            transport,
            session_token: RwLock::new(None),
        })
    }

    /// The underlying request builder, for callers that run their own I/O.
    pub fn client(&self) -> &PastyClient {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    pub fn username(&self) -> &str {
        self.client.username()
    }

    /// The token stored by the last successful `request_token`.
    pub fn session_token(&self) -> Option<SessionToken> {
        self.session_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn get_server_version(&self) -> Result<Value, ApiError> {
        let request = self.client.build_get_server_version()?;
        self.client.parse_get_server_version(self.exchange(request).await?)
    }

    pub async fn list_items(&self, credentials: &Credentials) -> Result<Vec<ClipboardItem>, ApiError> {
        let request = self.client.build_list_items(credentials)?;
        self.client.parse_list_items(self.exchange(request).await?)
    }

    pub async fn get_item(&self, id: &str, credentials: &Credentials) -> Result<ClipboardItem, ApiError> {
        let request = self.client.build_get_item(id, credentials)?;
        self.client.parse_get_item(self.exchange(request).await?)
    }

    pub async fn delete_item(&self, id: &str, credentials: &Credentials) -> Result<(), ApiError> {
        let request = self.client.build_delete_item(id, credentials)?;
        self.client.parse_delete_item(self.exchange(request).await?)
    }

    /// Store `item` and return the id the server assigned to it.
    pub async fn add_item(&self, item: &str, credentials: &Credentials) -> Result<String, ApiError> {
        let request = self.client.build_add_item(item, credentials)?;
        self.client.parse_add_item(self.exchange(request).await?)
    }

    /// Request a user token. On success the token also replaces the stored
    /// session token.
    pub async fn request_token(&self, username: &str, password: &str) -> Result<SessionToken, ApiError> {
        let request = self.client.build_request_token(username, password)?;
        let token = self.client.parse_request_token(self.exchange(request).await?)?;
        *self
            .session_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        tracing::info!(username, expires = ?token.expires(), "stored session token");
        Ok(token)
    }

    /// Returns the token's expiry as Unix time.
    pub async fn check_token_validity(&self, token: &str) -> Result<i64, ApiError> {
        let request = self.client.build_check_token_validity(token)?;
        self.client.parse_check_token_validity(self.exchange(request).await?)
    }

    pub async fn check_username_available(&self, username: &str) -> Result<Value, ApiError> {
        let request = self.client.build_check_username_available(username)?;
        self.client.parse_check_username_available(self.exchange(request).await?)
    }

    pub async fn get_user(&self, credentials: &Credentials) -> Result<Value, ApiError> {
        let request = self.client.build_get_user(credentials)?;
        self.client.parse_get_user(self.exchange(request).await?)
    }

    pub async fn update_user_password(
        &self,
        username: &str,
        uid: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let request =
            self.client
                .build_update_user_password(username, uid, current_password, new_password)?;
        self.client.parse_update_user_password(self.exchange(request).await?)
    }

    pub async fn delete_user(&self, username: &str, password: &str, uid: &str) -> Result<(), ApiError> {
        let request = self.client.build_delete_user(username, password, uid)?;
        self.client.parse_delete_user(self.exchange(request).await?)
    }

    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| transport_failure(&e))?;
        tracing::debug!(status = response.status, "received response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::{ready, Future};
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::auth::TOKEN_HEADER;
    use crate::http::{HttpMethod, TransportError};

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn with(responses: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(
            &self,
            request: HttpRequest,
        ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
            self.requests.lock().unwrap().push(request);
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            ready(next)
        }
    }

    fn ok(body: Value) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        })
    }

    fn api(transport: &Arc<ScriptedTransport>) -> PastyApiClient<Arc<ScriptedTransport>> {
        let config = ClientConfig::new("localhost", 8080).with_credentials("alice", "wonderland");
        PastyApiClient::new(config, Arc::clone(transport)).unwrap()
    }

    #[tokio::test]
    async fn add_item_returns_new_id() {
        let transport = ScriptedTransport::with(vec![ok(json!({"payload": {"_id": "abc123"}}))]);
        let id = api(&transport)
            .add_item("hello", &Credentials::Default)
            .await
            .unwrap();
        assert_eq!(id, "abc123");
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"item":"hello"}"#));
    }

    #[tokio::test]
    async fn delete_item_success_and_failure() {
        let transport = ScriptedTransport::with(vec![
            ok(json!({"code": 200})),
            ok(json!({"code": 404, "error": {"message": "not found"}})),
        ]);
        let api = api(&transport);
        api.delete_item("x", &Credentials::Default).await.unwrap();
        let err = api.delete_item("x", &Credentials::Default).await.unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
        assert_eq!(err.info().unwrap().message, "not found");
    }

    #[tokio::test]
    async fn usage_errors_never_reach_the_transport() {
        let transport = ScriptedTransport::with(Vec::new());
        let api = api(&transport);
        assert!(matches!(
            api.get_item("", &Credentials::Default).await,
            Err(ApiError::InvalidUsage(_))
        ));
        assert!(matches!(
            api.list_items(&Credentials::basic("", "pw")).await,
            Err(ApiError::InvalidUsage(_))
        ));
        assert!(matches!(
            api.delete_user("bob", "pw", "").await,
            Err(ApiError::InvalidUsage(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn request_token_stores_latest_token() {
        let transport = ScriptedTransport::with(vec![
            ok(json!({"code": 200, "payload": {"token": "t1", "expires": 10}})),
            ok(json!({"code": 200, "payload": {"token": "t2", "expires": 20}})),
        ]);
        let api = api(&transport);
        assert!(api.session_token().is_none());

        api.request_token("bob", "builder").await.unwrap();
        assert_eq!(api.session_token().unwrap().expires(), Some(10));

        let second = api.request_token("bob", "builder").await.unwrap();
        assert_eq!(api.session_token(), Some(second));
        assert_eq!(api.session_token().unwrap().get("token"), Some(&json!("t2")));
    }

    #[tokio::test]
    async fn failed_token_request_keeps_previous_token() {
        let transport = ScriptedTransport::with(vec![
            ok(json!({"code": 200, "payload": {"token": "t1"}})),
            ok(json!({"code": 401, "error": {"code": "NotAuthorized", "message": "bad"}})),
        ]);
        let api = api(&transport);
        api.request_token("bob", "builder").await.unwrap();
        assert!(api.request_token("bob", "wrong").await.is_err());
        assert_eq!(api.session_token().unwrap().get("token"), Some(&json!("t1")));
    }

    #[tokio::test]
    async fn check_token_validity_sends_token_header() {
        let transport = ScriptedTransport::with(vec![
            ok(json!({"code": 200, "payload": {"expires": 1700000000}})),
            ok(json!({"code": 200})),
        ]);
        let api = api(&transport);
        assert_eq!(api.check_token_validity("tok").await.unwrap(), 1700000000);
        assert!(matches!(
            api.check_token_validity("tok").await,
            Err(ApiError::ProtocolViolation(_))
        ));
        let sent = transport.requests();
        assert_eq!(sent[0].header(TOKEN_HEADER), Some("tok"));
        assert!(sent[0].header("Authorization").is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_normalized() {
        let transport = ScriptedTransport::with(vec![Err(TransportError::new("connection refused"))]);
        let err = api(&transport).get_server_version().await.unwrap_err();
        let ApiError::Transport(info) = err else {
            panic!("expected transport error, got {err:?}");
        };
        assert_eq!(info.code.as_deref(), Some("UnknownError"));
        assert_eq!(info.message, "Unknown error occured");
        assert_eq!(info.status_code, Some(0));
    }

    #[tokio::test]
    async fn list_items_without_payload() {
        let transport = ScriptedTransport::with(vec![ok(json!({"code": 200}))]);
        let err = api(&transport)
            .list_items(&Credentials::Default)
            .await
            .unwrap_err();
        let info = err.info().unwrap();
        assert_eq!(info.http_code, Some(500));
        assert_eq!(info.message, "Did not receive items");
    }

    #[tokio::test]
    async fn calls_can_run_on_spawned_tasks() {
        let transport = ScriptedTransport::with(vec![
            ok(json!({"code": 200, "payload": {"version": "2.1.0"}})),
            ok(json!({"code": 200, "payload": {"version": "2.1.0"}})),
        ]);
        let api = Arc::new(api(&transport));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let api = Arc::clone(&api);
                tokio::spawn(async move { api.get_server_version().await })
            })
            .collect();
        for handle in handles {
            let version = handle.await.unwrap().unwrap();
            assert_eq!(version["version"], "2.1.0");
        }
        assert_eq!(transport.requests().len(), 2);
    }
}

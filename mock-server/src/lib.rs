//! In-memory Pasty API server for exercising the client over real HTTP.
//!
//! Successful answers use the Pasty envelope `{"code": 200, "payload": ...}`.
//! Failures use a status code plus `{"code": "<Name>", "message": ...}`.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_VERSION: &str = "2.1.0";
pub const TOKEN_HEADER: &str = "x-pasty-token";
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    pub item: String,
    #[serde(skip)]
    pub owner: String,
}

#[derive(Clone, Debug)]
struct Token {
    owner: String,
    expires: i64,
}

#[derive(Debug, Default)]
pub struct Store {
    users: HashMap<String, User>,
    items: HashMap<String, Item>,
    tokens: HashMap<String, Token>,
}

impl Store {
    /// Register a user and return the new user id.
    pub fn add_user(&mut self, username: &str, password: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.users.insert(
            id.clone(),
            User {
                id: id.clone(),
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        id
    }

    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }

    /// Forget tokens that expired at or before `now`.
    pub fn prune_expired_tokens(&mut self, now: i64) {
        self.tokens.retain(|_, token| token.expires > now);
    }
}

pub type Db = Arc<RwLock<Store>>;

/// A store pre-populated with `(username, password)` accounts.
pub fn seeded(users: &[(&str, &str)]) -> Db {
    let mut store = Store::default();
    for (username, password) in users {
        store.add_user(username, password);
    }
    Arc::new(RwLock::new(store))
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route("/server/version", get(server_version))
        .route("/server/user/available", get(username_available))
        .route("/clipboard/list.json", get(list_items))
        .route("/clipboard/item", post(add_item))
        .route("/clipboard/item/{id}", get(get_item).delete(delete_item))
        .route("/user", get(get_user))
        .route("/user/token", get(request_token))
        .route("/user/token/validity", get(token_validity))
        .route("/user/{uid}", put(update_password).delete(delete_user))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

// ---------------------------------------------------------------------------
// Errors and answers
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, code: &'static str, message: &str) -> Self {
        Self {
            status,
            code,
            message: message.to_string(),
        }
    }

    fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "InvalidCredentials", message)
    }

    fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "NotAuthorized", "not allowed to modify this user")
    }

    fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "ResourceNotFound", message)
    }

    fn missing(parameter: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "MissingParameter",
            &format!("{parameter} is required"),
        )
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = Json(json!({ "code": self.code, "message": self.message }));
        (self.status, body).into_response()
    }
}

fn answer(payload: Value) -> Json<Value> {
    Json(json!({ "code": 200, "payload": payload }))
}

fn done() -> Json<Value> {
    Json(json!({ "code": 200 }))
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Decode `Authorization: Basic base64(user:password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn token_owner(store: &Store, headers: &HeaderMap) -> Option<Result<Token, Failure>> {
    let token = headers.get(TOKEN_HEADER)?.to_str().ok()?;
    Some(
        store
            .tokens
            .get(token)
            .filter(|t| t.expires > now())
            .cloned()
            .ok_or_else(|| Failure::unauthorized("token is invalid or expired")),
    )
}

fn authenticate(store: &Store, headers: &HeaderMap) -> Result<User, Failure> {
    if let Some(token) = token_owner(store, headers) {
        let token = token?;
        return store
            .users
            .get(&token.owner)
            .cloned()
            .ok_or_else(|| Failure::unauthorized("token owner no longer exists"));
    }
    let (username, password) =
        basic_credentials(headers).ok_or_else(|| Failure::unauthorized("credentials required"))?;
    match store.user_by_name(&username) {
        Some(user) if user.password == password => Ok(user.clone()),
        _ => {
            tracing::debug!(username = %username, "rejected login");
            Err(Failure::unauthorized("wrong username or password"))
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn server_version() -> Json<Value> {
    answer(json!({ "version": API_VERSION }))
}

#[derive(Deserialize)]
struct AvailableQuery {
    username: Option<String>,
}

async fn username_available(
    State(db): State<Db>,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<Value>, Failure> {
    let username = query
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Failure::missing("username"))?;
    let available = db.read().await.user_by_name(&username).is_none();
    Ok(answer(json!({ "username": username, "available": available })))
}

async fn list_items(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let mut items: Vec<&Item> = store.items.values().filter(|i| i.owner == user.id).collect();
    items.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(answer(json!({ "items": items })))
}

#[derive(Deserialize)]
struct NewItem {
    #[serde(default)]
    item: String,
}

async fn add_item(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<NewItem>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if input.item.is_empty() {
        return Err(Failure::missing("item"));
    }
    let id = Uuid::new_v4().simple().to_string();
    store.items.insert(
        id.clone(),
        Item {
            id: id.clone(),
            item: input.item,
            owner: user.id,
        },
    );
    tracing::info!(item = %id, "item added");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "code": 201, "payload": { "_id": id } })),
    ))
}

async fn get_item(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    let item = store
        .items
        .get(&id)
        .filter(|i| i.owner == user.id)
        .ok_or_else(|| Failure::not_found("item not found"))?;
    Ok(answer(json!(item)))
}

async fn delete_item(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if !store.items.get(&id).is_some_and(|i| i.owner == user.id) {
        return Err(Failure::not_found("item not found"));
    }
    store.items.remove(&id);
    tracing::info!(item = %id, "item deleted");
    Ok(done())
}

async fn get_user(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let user = authenticate(&store, &headers)?;
    Ok(answer(json!({ "_id": user.id, "username": user.username })))
}

async fn request_token(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    let issued = now();
    store.prune_expired_tokens(issued);
    let value = Uuid::new_v4().to_string();
    let expires = issued + TOKEN_LIFETIME_SECS;
    store.tokens.insert(
        value.clone(),
        Token {
            owner: user.id,
            expires,
        },
    );
    Ok(answer(json!({ "token": value, "expires": expires })))
}

async fn token_validity(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let token = token_owner(&store, &headers)
        .ok_or_else(|| Failure::unauthorized("token required"))??;
    Ok(answer(json!({ "expires": token.expires })))
}

#[derive(Deserialize)]
struct PasswordChange {
    #[serde(rename = "newPassword")]
    new_password: String,
}

async fn update_password(
    State(db): State<Db>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Json(input): Json<PasswordChange>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if user.id != uid {
        return Err(Failure::forbidden());
    }
    if input.new_password.is_empty() {
        return Err(Failure::missing("newPassword"));
    }
    if let Some(stored) = store.users.get_mut(&uid) {
        stored.password = input.new_password;
    }
    tracing::info!(user = %uid, "password changed");
    Ok(done())
}

async fn delete_user(
    State(db): State<Db>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if user.id != uid {
        return Err(Failure::forbidden());
    }
    store.users.remove(&uid);
    store.items.retain(|_, item| item.owner != uid);
    store.tokens.retain(|_, token| token.owner != uid);
    tracing::info!(user = %uid, "user deleted");
    Ok(done())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn item_serializes_without_owner() {
        let item = Item {
            id: "i1".to_string(),
            item: "hello".to_string(),
            owner: "u1".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({ "_id": "i1", "item": "hello" }));
    }

    #[test]
    fn basic_credentials_decodes_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Basic YWxpY2U6d29uZGVybGFuZA=="),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("alice".to_string(), "wonderland".to_string()))
        );
    }

    #[test]
    fn basic_credentials_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&headers), None);
    }

    #[test]
    fn password_may_contain_colons() {
        let mut headers = HeaderMap::new();
        let encoded = format!("Basic {}", STANDARD.encode("bob:a:b"));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&encoded).unwrap());
        assert_eq!(
            basic_credentials(&headers),
            Some(("bob".to_string(), "a:b".to_string()))
        );
    }

    #[test]
    fn seeded_store_finds_users_by_name() {
        let db = seeded(&[("alice", "wonderland")]);
        let store = db.try_read().unwrap();
        let user = store.user_by_name("alice").unwrap();
        assert_eq!(user.password, "wonderland");
        assert!(store.user_by_name("bob").is_none());
    }

    #[test]
    fn authenticate_rejects_expired_token() {
        let mut store = Store::default();
        let owner = store.add_user("alice", "pw");
        store.tokens.insert(
            "old".to_string(),
            Token {
                owner,
                expires: now() - 1,
            },
        );
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static("old"));
        let err = authenticate(&store, &headers).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn prune_drops_only_expired_tokens() {
        let mut store = Store::default();
        let owner = store.add_user("alice", "pw");
        for (value, expires) in [("old", 100), ("edge", 200), ("live", 300)] {
            store.tokens.insert(
                value.to_string(),
                Token {
                    owner: owner.clone(),
                    expires,
                },
            );
        }
        store.prune_expired_tokens(200);
        let mut left: Vec<_> = store.tokens.keys().cloned().collect();
        left.sort();
        assert_eq!(left, vec!["live".to_string()]);
    }
}

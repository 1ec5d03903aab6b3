//! Stateless HTTP request builder and response parser for the Pasty API.
//!
//! # Design
//! `PastyClient` holds only the endpoint configuration. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`. All builders funnel
//! through the verb helpers (`get`, `post`, `put`, `delete`) into one
//! `request` routine, and all parsers start from `read_answer`, so headers
//! and error normalization are identical across operations.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::auth::{AuthData, Credentials};
use crate::config::{ClientConfig, API_VERSION, USER_AGENT};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, TransportError};
use crate::types::{
    unix_time, Answer, ClipboardItem, ErrorInfo, NewItem, PasswordChange, SessionToken,
};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Synchronous, stateless client for the Pasty API.
#[derive(Debug, Clone)]
pub struct PastyClient {
    config: ClientConfig,
    base_url: Url,
}

impl PastyClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let raw = format!("{}://{}:{}/", config.scheme(), config.host, config.port);
        let base_url =
            Url::parse(&raw).map_err(|e| ApiError::InvalidConfig(format!("{raw}: {e}")))?;
        Ok(Self { config, base_url })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The configured default username.
    pub fn username(&self) -> &str {
        &self.config.username
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn build_get_server_version(&self) -> Result<HttpRequest, ApiError> {
        self.get(&["server", "version"], &[], &AuthData::anonymous())
    }

    pub fn build_list_items(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let auth = credentials.resolve(&self.config)?;
        self.get(&["clipboard", "list.json"], &[], &auth)
    }

    pub fn build_get_item(
        &self,
        id: &str,
        credentials: &Credentials,
    ) -> Result<HttpRequest, ApiError> {
        require(id, "item id")?;
        let auth = credentials.resolve(&self.config)?;
        self.get(&["clipboard", "item", id], &[], &auth)
    }

    pub fn build_delete_item(
        &self,
        id: &str,
        credentials: &Credentials,
    ) -> Result<HttpRequest, ApiError> {
        require(id, "item id")?;
        let auth = credentials.resolve(&self.config)?;
        self.delete(&["clipboard", "item", id], &auth)
    }

    pub fn build_add_item(
        &self,
        item: &str,
        credentials: &Credentials,
    ) -> Result<HttpRequest, ApiError> {
        let auth = credentials.resolve(&self.config)?;
        let body = NewItem {
            item: item.to_string(),
        };
        self.post(&["clipboard", "item"], &auth, &body)
    }

    pub fn build_request_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<HttpRequest, ApiError> {
        let auth = Credentials::basic(username, password).resolve(&self.config)?;
        self.get(&["user", "token"], &[], &auth)
    }

    pub fn build_check_token_validity(&self, token: &str) -> Result<HttpRequest, ApiError> {
        let auth = Credentials::token(token).resolve(&self.config)?;
        self.get(&["user", "token", "validity"], &[], &auth)
    }

    pub fn build_check_username_available(&self, username: &str) -> Result<HttpRequest, ApiError> {
        require(username, "username")?;
        self.get(
            &["server", "user", "available"],
            &[("username", username)],
            &AuthData::anonymous(),
        )
    }

    pub fn build_get_user(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let auth = credentials.resolve(&self.config)?;
        self.get(&["user"], &[], &auth)
    }

    pub fn build_update_user_password(
        &self,
        username: &str,
        uid: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<HttpRequest, ApiError> {
        require(uid, "user id")?;
        let auth = Credentials::basic(username, current_password).resolve(&self.config)?;
        let body = PasswordChange {
            new_password: new_password.to_string(),
        };
        self.put(&["user", uid], &auth, &body)
    }

    pub fn build_delete_user(
        &self,
        username: &str,
        password: &str,
        uid: &str,
    ) -> Result<HttpRequest, ApiError> {
        require(uid, "user id")?;
        let auth = Credentials::basic(username, password).resolve(&self.config)?;
        self.delete(&["user", uid], &auth)
    }

    // -----------------------------------------------------------------------
    // Parsers
    // -----------------------------------------------------------------------

    pub fn parse_get_server_version(&self, response: HttpResponse) -> Result<Value, ApiError> {
        let answer = read_answer(response)?;
        Ok(answer.payload.unwrap_or(Value::Null))
    }

    pub fn parse_list_items(&self, response: HttpResponse) -> Result<Vec<ClipboardItem>, ApiError> {
        let answer = read_answer(response)?;
        let Some(items) = answer.payload.as_ref().and_then(|p| p.get("items")) else {
            return Err(ApiError::Server(ErrorInfo::with_http_code(500, "Did not receive items")));
        };
        serde_json::from_value(items.clone())
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn parse_get_item(&self, response: HttpResponse) -> Result<ClipboardItem, ApiError> {
        let answer = read_answer(response)?;
        match answer.payload {
            Some(payload) => serde_json::from_value(payload)
                .map_err(|e| ApiError::DeserializationError(e.to_string())),
            None => Err(forward_error(&answer)),
        }
    }

    pub fn parse_delete_item(&self, response: HttpResponse) -> Result<(), ApiError> {
        expect_ok_code(read_answer(response)?)
    }

    /// Returns the id the server assigned to the new item.
    pub fn parse_add_item(&self, response: HttpResponse) -> Result<String, ApiError> {
        let answer = read_answer(response)?;
        let Some(payload) = answer.payload.as_ref() else {
            return Err(forward_error(&answer));
        };
        match payload.get("_id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ApiError::ProtocolViolation(
                "item was created but the server returned no _id".to_string(),
            )),
        }
    }

    pub fn parse_request_token(&self, response: HttpResponse) -> Result<SessionToken, ApiError> {
        let answer = read_answer(response)?;
        match answer.payload {
            Some(payload) => Ok(SessionToken::new(payload)),
            None => Err(forward_error(&answer)),
        }
    }

    /// Returns the token's expiry as Unix time, truncating fractional
    /// seconds.
    pub fn parse_check_token_validity(&self, response: HttpResponse) -> Result<i64, ApiError> {
        let answer = read_answer(response)?;
        if !answer.is_ok() {
            return Err(forward_error(&answer));
        }
        answer
            .payload
            .as_ref()
            .and_then(|p| p.get("expires"))
            .and_then(unix_time)
            .ok_or_else(|| {
                tracing::warn!("token validity answer lacks payload.expires");
                ApiError::ProtocolViolation("Server did not answer according to API".to_string())
            })
    }

    pub fn parse_check_username_available(&self, response: HttpResponse) -> Result<Value, ApiError> {
        let answer = read_answer(response)?;
        Ok(answer.payload.unwrap_or(Value::Null))
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<Value, ApiError> {
        let answer = read_answer(response)?;
        if !answer.is_ok() {
            return Err(forward_error(&answer));
        }
        Ok(answer.payload.unwrap_or(Value::Null))
    }

    pub fn parse_update_user_password(&self, response: HttpResponse) -> Result<(), ApiError> {
        expect_ok_code(read_answer(response)?)
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        expect_ok_code(read_answer(response)?)
    }

    // -----------------------------------------------------------------------
    // Request construction
    // -----------------------------------------------------------------------

    fn get(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        auth: &AuthData,
    ) -> Result<HttpRequest, ApiError> {
        self.request::<()>(HttpMethod::Get, segments, query, auth, None)
    }

    fn post<B: Serialize>(
        &self,
        segments: &[&str],
        auth: &AuthData,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Post, segments, &[], auth, Some(body))
    }

    fn put<B: Serialize>(
        &self,
        segments: &[&str],
        auth: &AuthData,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Put, segments, &[], auth, Some(body))
    }

    fn delete(&self, segments: &[&str], auth: &AuthData) -> Result<HttpRequest, ApiError> {
        self.request::<()>(HttpMethod::Delete, segments, &[], auth, None)
    }

    fn request<B: Serialize>(
        &self,
        method: HttpMethod,
        segments: &[&str],
        query: &[(&str, &str)],
        auth: &AuthData,
        body: Option<&B>,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidConfig(format!("{} cannot carry a path", self.base_url)))?
            .clear()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut headers = vec![
            ("Accept-Version".to_string(), API_VERSION.to_string()),
            ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
        ];
        headers.extend(auth.headers());

        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Response normalization
// ---------------------------------------------------------------------------

/// Turn a raw response into the server's answer envelope.
///
/// 2xx bodies must be JSON. Any other status becomes an error: 401 maps to
/// `Unauthorized`, a JSON object body is forwarded as the error details, and
/// everything else is a generic transport error. The status is always
/// recorded in `status_code`.
pub fn read_answer(response: HttpResponse) -> Result<Answer, ApiError> {
    if response.is_success() {
        return serde_json::from_str(&response.body).map_err(|_| {
            let mut info = ErrorInfo::new("UnknownError", "Invalid JSON received");
            info.status_code = Some(response.status);
            ApiError::InvalidResponse(info)
        });
    }

    let unauthorized = response.status == 401;
    let mut info = if unauthorized {
        ErrorInfo::new("UnauthorizedError", "Login failed")
    } else {
        ErrorInfo::new("UnknownError", "Unknown error occured")
    };
    let structured = serde_json::from_str::<Value>(&response.body)
        .ok()
        .filter(Value::is_object);
    if let Some(body) = &structured {
        info = ErrorInfo::from_value(body);
    }
    info.status_code = Some(response.status);

    Err(if unauthorized {
        ApiError::Unauthorized(info)
    } else if structured.is_some() {
        ApiError::Server(info)
    } else {
        ApiError::Transport(info)
    })
}

/// Normalize an exchange that produced no response.
pub fn transport_failure(error: &TransportError) -> ApiError {
    tracing::warn!(error = %error, "request failed without a response");
    let mut info = ErrorInfo::new("UnknownError", "Unknown error occured");
    info.status_code = Some(0);
    ApiError::Transport(info)
}

/// The server's own error, or a generic one when the envelope has none.
fn forward_error(answer: &Answer) -> ApiError {
    let info = answer
        .error_info()
        .unwrap_or_else(|| ErrorInfo::with_http_code(500, "An unknown error occured"));
    ApiError::Server(info)
}

fn expect_ok_code(answer: Answer) -> Result<(), ApiError> {
    if answer.is_ok() {
        Ok(())
    } else {
        Err(forward_error(&answer))
    }
}

fn require(value: &str, what: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::InvalidUsage(format!("{what} must not be empty")));
    }
    Ok(())
}

//! Per-call authentication.
//!
//! # Design
//! Callers state how a request authenticates with `Credentials`. The client
//! resolves that against its configured defaults into an `AuthData`, which
//! lives for exactly one request and turns into headers.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Header carrying a Pasty user token.
pub const TOKEN_HEADER: &str = "X-Pasty-Token";

/// How a single operation authenticates.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Use the username and password from `ClientConfig`.
    #[default]
    Default,
    UsernamePassword { username: String, password: String },
    Token(String),
}

impl Credentials {
    pub fn basic(username: &str, password: &str) -> Self {
        Credentials::UsernamePassword {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn token(token: &str) -> Self {
        Credentials::Token(token.to_string())
    }

    /// Resolve against configured defaults.
    pub fn resolve(&self, config: &ClientConfig) -> Result<AuthData, ApiError> {
        match self {
            Credentials::Default => Ok(AuthData {
                username: Some(config.username.clone()).filter(|u| !u.is_empty()),
                password: Some(config.password.clone()),
                token: None,
            }),
            Credentials::UsernamePassword { username, password } => {
                if username.is_empty() {
                    return Err(ApiError::InvalidUsage("username must not be empty".to_string()));
                }
                Ok(AuthData {
                    username: Some(username.clone()),
                    password: Some(password.clone()),
                    token: None,
                })
            }
            Credentials::Token(token) => {
                if token.is_empty() {
                    return Err(ApiError::InvalidUsage("token must not be empty".to_string()));
                }
                Ok(AuthData {
                    username: None,
                    password: None,
                    token: Some(token.clone()),
                })
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Default => f.write_str("Default"),
            Credentials::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Token(_) => f.write_str("Token(..)"),
        }
    }
}

/// Authentication resolved for one request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthData {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthData")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthData {
    /// No authentication at all, not even configured defaults.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `Basic base64(user:password)`, present only when a username is set.
    pub fn basic_header(&self) -> Option<String> {
        let username = self.username.as_deref()?;
        let password = self.password.as_deref().unwrap_or_default();
        Some(format!("Basic {}", STANDARD.encode(format!("{username}:{password}"))))
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(basic) = self.basic_header() {
            headers.push(("Authorization".to_string(), basic));
        }
        if let Some(token) = &self.token {
            headers.push((TOKEN_HEADER.to_string(), token.clone()));
        }
        headers
    }
}

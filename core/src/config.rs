//! Client configuration.
//!
//! # Design
//! `ClientConfig` names one server endpoint plus optional default
//! credentials. It never changes after the client is built. It can be
//! assembled in code, deserialized from any serde format, or read from
//! `PASTY_*` environment variables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Pasty API version sent in `Accept-Version`.
pub const API_VERSION: &str = "2.1.0";

/// Value of the `User-Agent` header.
pub const USER_AGENT: &str = concat!("pasty-client/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ClientConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            use_tls: false,
            username: String::new(),
            password: String::new(),
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Default credentials used when an operation is called with
    /// `Credentials::Default`.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    /// Read `PASTY_HOST`, `PASTY_PORT`, `PASTY_TLS`, `PASTY_USERNAME` and
    /// `PASTY_PASSWORD`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let host = lookup("PASTY_HOST")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ApiError::InvalidConfig("PASTY_HOST is not set".to_string()))?;
        let use_tls = match lookup("PASTY_TLS").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ApiError::InvalidConfig(format!(
                    "PASTY_TLS must be true or false, got {other:?}"
                )))
            }
        };
        let port = match lookup("PASTY_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ApiError::InvalidConfig(format!("PASTY_PORT {raw:?}: {e}")))?,
            None if use_tls => 443,
            None => 80,
        };
        let config = Self {
            host,
            port,
            use_tls,
            username: lookup("PASTY_USERNAME").unwrap_or_default(),
            password: lookup("PASTY_PASSWORD").unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.host.trim().is_empty() {
            return Err(ApiError::InvalidConfig("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ApiError::InvalidConfig("port must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

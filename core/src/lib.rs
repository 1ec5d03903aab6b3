//! Client library for the Pasty clipboard service (API 2.1).
//!
//! # Overview
//! `PastyClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network. `PastyApiClient` wraps it with an injected
//! `Transport` and exposes one `async fn` per remote operation.
//!
//! # Design
//! - Authentication is chosen per call with `Credentials`; `Default` falls
//!   back to the username and password in `ClientConfig`.
//! - Every request goes through one routine, so headers (API version, JSON
//!   content type, user agent, no caching, auth) are uniform.
//! - Every response goes through `read_answer`, which maps HTTP statuses and
//!   bodies onto `ApiError`.
//! - The only mutable state is the session token kept by `PastyApiClient`.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "reqwest")]
pub mod transport;
pub mod types;

pub use api::PastyApiClient;
pub use auth::{AuthData, Credentials};
pub use client::PastyClient;
pub use config::{ClientConfig, API_VERSION, USER_AGENT};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use types::{Answer, ClipboardItem, ErrorInfo, SessionToken};

//! Error types for the Pasty API client.
//!
//! # Design
//! Variants follow where a failure comes from, so callers can tell a rejected
//! login from a missing item from a dead network. Every variant that reflects
//! something the server or transport said carries an `ErrorInfo`, reachable
//! uniformly through `ApiError::info`.

use crate::types::ErrorInfo;

/// Errors returned by `PastyClient` and `PastyApiClient`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The call itself was malformed. Raised before any request is sent.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// The client configuration cannot address a server.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No usable response: connection failure, or an error status without a
    /// structured body.
    #[error("transport error: {}", describe(.0))]
    Transport(ErrorInfo),

    /// The server rejected the credentials (HTTP 401).
    #[error("unauthorized: {}", describe(.0))]
    Unauthorized(ErrorInfo),

    /// The server reported an application error, forwarded verbatim.
    #[error("server error: {}", describe(.0))]
    Server(ErrorInfo),

    /// The server answered with success but without the fields the API
    /// promises. Not retried.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A success response whose body is not JSON.
    #[error("invalid response: {}", describe(.0))]
    InvalidResponse(ErrorInfo),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The payload did not have the expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),
}

impl ApiError {
    /// The structured error details, when the failure carries any.
    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            ApiError::Transport(info)
            | ApiError::Unauthorized(info)
            | ApiError::Server(info)
            | ApiError::InvalidResponse(info) => Some(info),
            _ => None,
        }
    }

    /// The HTTP status of the response that caused this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.info().and_then(|info| info.status_code)
    }
}

fn describe(info: &ErrorInfo) -> String {
    let mut out = String::new();
    if let Some(code) = &info.code {
        out.push_str(code);
        out.push_str(": ");
    }
    out.push_str(&info.message);
    if let Some(status) = info.status_code.or(info.http_code) {
        out.push_str(&format!(" (HTTP {status})"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_message_and_status() {
        let mut info = ErrorInfo::new("UnauthorizedError", "Login failed");
        info.status_code = Some(401);
        let err = ApiError::Unauthorized(info);
        assert_eq!(err.to_string(), "unauthorized: UnauthorizedError: Login failed (HTTP 401)");
        assert_eq!(err.status_code(), Some(401));
    }

    #[test]
    fn usage_errors_carry_no_info() {
        let err = ApiError::InvalidUsage("item id must not be empty".to_string());
        assert!(err.info().is_none());
        assert_eq!(err.to_string(), "invalid usage: item id must not be empty");
    }
}

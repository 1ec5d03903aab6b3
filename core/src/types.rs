//! Wire types for the Pasty API.
//!
//! # Design
//! The response envelope is defined by the server, not by this client, so
//! every field of `Answer` is optional and `ErrorInfo` is read leniently from
//! whatever JSON object the server produced. Unknown item fields are kept in
//! `extra` rather than dropped.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The server's response envelope: `{ code?, payload?, error? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Answer {
    /// True when `code` is the number 200. Any other code, including a
    /// symbolic string, is not success.
    pub fn is_ok(&self) -> bool {
        self.code.as_ref().and_then(Value::as_u64) == Some(200)
    }

    /// The envelope's `error` member as an `ErrorInfo`, if present.
    pub fn error_info(&self) -> Option<ErrorInfo> {
        self.error.as_ref().map(ErrorInfo::from_value)
    }
}

/// Error details as reported by the server or synthesized by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(
        rename = "httpCode",
        alias = "http_code",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub http_code: Option<u16>,
    #[serde(rename = "statusCode", default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            message: message.to_string(),
            ..Self::default()
        }
    }

    /// An error carrying an HTTP-style code and no symbolic code.
    pub fn with_http_code(http_code: u16, message: &str) -> Self {
        Self {
            http_code: Some(http_code),
            message: message.to_string(),
            ..Self::default()
        }
    }

    /// Read an error object without insisting on exact field types.
    ///
    /// `code` may be a string or a number; a bare string becomes the message.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self {
                message: match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
                ..Self::default()
            };
        };
        let number = |key: &str| {
            obj.get(key)
                .and_then(Value::as_u64)
                .and_then(|n| u16::try_from(n).ok())
        };
        Self {
            http_code: number("httpCode").or_else(|| number("http_code")),
            status_code: number("statusCode"),
            code: obj.get("code").and_then(|code| match code {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            message: obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// A clipboard entry as stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardItem {
    #[serde(rename = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    /// The stored content as the server sent it, usually a string.
    #[serde(default)]
    pub item: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClipboardItem {
    pub fn text(&self) -> Option<&str> {
        self.item.as_str()
    }
}

/// Ids arrive as strings from document stores and as numbers from others.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}

/// Unix time from a JSON number. Fractional seconds are truncated.
pub fn unix_time(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Opaque token object issued by `/user/token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Value);

impl SessionToken {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unix time at which the server says the token expires. Informational
    /// only; the client never acts on it.
    pub fn expires(&self) -> Option<i64> {
        self.0.get("expires").and_then(unix_time)
    }
}

/// Body of `POST /clipboard/item`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub item: String,
}

/// Body of `PUT /user/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

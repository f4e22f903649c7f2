//! Error types for the todo API client.
//!
//! # Design
//! Three outcomes come from the wire: no response at all (`Transport`), a
//! 401 (`Unauthorized`) and any other non-2xx (`Server`). The two response
//! variants carry the server's error payload as JSON; a body that is not
//! JSON is kept as a JSON string. A 401 has already cleared the session by
//! the time the caller sees it; `redirect` tells the caller where to go.

use std::fmt;

use serde_json::Value;

use crate::router::Route;
use crate::session::SessionError;

/// Errors returned by `TodoClient` parse methods and `TodoApi` calls.
#[derive(Debug)]
pub enum ApiError {
    /// The request never produced a response.
    Transport(String),

    /// The server rejected the credentials (HTTP 401).
    Unauthorized { payload: Value },

    /// The server returned a non-2xx status other than 401.
    Server { status: u16, payload: Value },

    /// The response body could not be deserialized into the expected type.
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    SerializationError(String),

    /// The session record could not be read or written.
    Session(SessionError),

    /// A user-scoped call was made without an owner id.
    MissingUserId,
}

impl ApiError {
    /// Route the UI should navigate to after this error, if any.
    pub fn redirect(&self) -> Option<Route> {
        match self {
            ApiError::Unauthorized { .. } => Some(Route::Login),
            _ => None,
        }
    }

    /// Server error payload, for the variants that have one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ApiError::Unauthorized { payload } | ApiError::Server { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message from the payload: its `message` or `error`
    /// field, or the payload itself when it is a plain string.
    pub fn server_message(&self) -> Option<&str> {
        let payload = self.payload()?;
        payload
            .get("message")
            .or_else(|| payload.get("error"))
            .unwrap_or(payload)
            .as_str()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "request failed: {msg}"),
            ApiError::Unauthorized { .. } => match self.server_message() {
                Some(msg) => write!(f, "unauthorized: {msg}"),
                None => write!(f, "unauthorized"),
            },
            ApiError::Server { status, payload } => match self.server_message() {
                Some(msg) => write!(f, "HTTP {status}: {msg}"),
                None => write!(f, "HTTP {status}: {payload}"),
            },
            ApiError::DeserializationError(msg) => {
                write!(f, "deserialization failed: {msg}")
            }
            ApiError::SerializationError(msg) => {
                write!(f, "serialization failed: {msg}")
            }
            ApiError::Session(err) => write!(f, "{err}"),
            ApiError::MissingUserId => write!(f, "no user id available for this request"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Session(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Session(err)
    }
}

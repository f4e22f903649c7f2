//! Domain DTOs for the todo API.
//!
//! # Design
//! The server owns the todo schema; the client only relies on `_id`,
//! `completed` and `completed_time`. Every other field the server sends is
//! kept in `extra` so an update round-trips it untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single todo item returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "completed_time")]
    pub completed_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Todo {
    /// Set `completed_time` from the completion flag: `now` when completed,
    /// cleared otherwise.
    pub fn stamp_completion(&mut self, now: DateTime<Utc>) {
        self.completed_time = if self.completed { Some(now) } else { None };
    }

    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }
}

/// Request payload for creating a new todo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

/// Body of a successful login or registration.
///
/// Older servers answer registration without a token, so it is optional
/// here; everything else is kept as-is and becomes part of the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// `completed_time` is sent as epoch milliseconds and may come back either
/// as milliseconds or as an RFC 3339 string.
mod completed_time {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_i64(at.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Millis(ms)) => DateTime::from_timestamp_millis(ms)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {ms}"))),
            Some(Raw::Text(text)) => DateTime::parse_from_rfc3339(&text)
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn todo_keeps_unknown_fields() {
        let todo: Todo = serde_json::from_str(
            r#"{"_id":"a1","title":"Buy milk","completed":false,"userId":"u1","completed_time":null}"#,
        )
        .unwrap();
        assert_eq!(todo.id, "a1");
        assert_eq!(todo.title(), Some("Buy milk"));
        assert_eq!(todo.extra["userId"], "u1");

        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["_id"], "a1");
        assert_eq!(json["userId"], "u1");
        assert!(json["completed_time"].is_null());
    }

    #[test]
    fn completed_time_accepts_millis_and_rfc3339() {
        let from_ms: Todo =
            serde_json::from_str(r#"{"_id":"1","completed":true,"completed_time":1700000000000}"#).unwrap();
        let from_text: Todo = serde_json::from_str(
            r#"{"_id":"1","completed":true,"completed_time":"2023-11-14T22:13:20.000Z"}"#,
        )
        .unwrap();
        let expected = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(from_ms.completed_time, Some(expected));
        assert_eq!(from_text.completed_time, Some(expected));
    }

    #[test]
    fn completed_time_is_optional() {
        let todo: Todo = serde_json::from_str(r#"{"_id":"1"}"#).unwrap();
        assert!(!todo.completed);
        assert!(todo.completed_time.is_none());
    }

    #[test]
    fn stamp_completion_follows_flag() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut todo: Todo = serde_json::from_str(r#"{"_id":"1","completed":true}"#).unwrap();
        todo.stamp_completion(now);
        assert_eq!(todo.completed_time, Some(now));

        todo.completed = false;
        todo.stamp_completion(now);
        assert!(todo.completed_time.is_none());
    }

    #[test]
    fn auth_payload_without_token() {
        let payload: AuthPayload =
            serde_json::from_str(r#"{"message":"registered","user":{"_id":"u1"}}"#).unwrap();
        assert!(payload.token.is_none());
        assert_eq!(payload.profile["user"]["_id"], "u1");
    }
}

//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url`. Each endpoint is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`; the caller executes the round-trip.
//!
//! Every `build_*` goes through `request`, which attaches the session token,
//! and every `parse_*` goes through `intercept`, which clears the session on
//! a 401 and unwraps the `{"data": ...}` envelope. The session context is
//! passed in explicitly on both sides.

use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::{Session, SessionContext};
use crate::types::{AuthPayload, LoginUser, NewTodo, RegisterUser, Todo};

/// Header carrying the raw token, alongside `Authorization: Bearer`.
pub const TOKEN_HEADER: &str = "x-access-token";

/// Characters left alone when encoding a path segment or query value.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- users ---

    pub fn build_register(
        &self,
        session: &SessionContext,
        input: &RegisterUser,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        Ok(self.request(session, HttpMethod::Post, "/users/register".to_string(), Some(body)))
    }

    pub fn build_login(&self, session: &SessionContext, input: &LoginUser) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        Ok(self.request(session, HttpMethod::Post, "/users/login".to_string(), Some(body)))
    }

    // --- todos ---

    pub fn build_list_todos(&self, session: &SessionContext, user_id: &str) -> HttpRequest {
        self.request(session, HttpMethod::Get, format!("/todos?userId={}", encode(user_id)), None)
    }

    pub fn build_create_todo(
        &self,
        session: &SessionContext,
        input: &NewTodo,
        user_id: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        Ok(self.request(
            session,
            HttpMethod::Post,
            format!("/todos?userId={}", encode(user_id)),
            Some(body),
        ))
    }

    /// Build the update request, stamping `completed_time` with the current
    /// time when the todo is completed and clearing it otherwise.
    pub fn build_update_todo(&self, session: &SessionContext, todo: &Todo) -> Result<HttpRequest, ApiError> {
        self.build_update_todo_at(session, todo, Utc::now())
    }

    pub fn build_update_todo_at(
        &self,
        session: &SessionContext,
        todo: &Todo,
        now: DateTime<Utc>,
    ) -> Result<HttpRequest, ApiError> {
        let mut todo = todo.clone();
        todo.stamp_completion(now);
        let body = to_json(&todo)?;
        Ok(self.request(session, HttpMethod::Put, format!("/todos/{}", encode(&todo.id)), Some(body)))
    }

    pub fn build_delete_todo(&self, session: &SessionContext, id: &str) -> HttpRequest {
        self.request(session, HttpMethod::Delete, format!("/todos/{}", encode(id)), None)
    }

    pub fn build_delete_all_todos(&self, session: &SessionContext, user_id: &str) -> HttpRequest {
        self.request(
            session,
            HttpMethod::Delete,
            format!("/todos/delete/all?userId={}", encode(user_id)),
            None,
        )
    }

    // --- parsing ---

    /// Parse a registration response. Signs the session in when the server
    /// already issued a token.
    pub fn parse_register(
        &self,
        session: &mut SessionContext,
        response: HttpResponse,
    ) -> Result<AuthPayload, ApiError> {
        let payload: AuthPayload = decode(intercept(session, response)?)?;
        remember(session, &payload)?;
        Ok(payload)
    }

    /// Parse a login response and sign the session in with its token. A
    /// successful reply without a token is an error.
    pub fn parse_login(
        &self,
        session: &mut SessionContext,
        response: HttpResponse,
    ) -> Result<AuthPayload, ApiError> {
        let payload: AuthPayload = decode(intercept(session, response)?)?;
        let new_session = Session::from_auth(payload.clone())
            .ok_or_else(|| ApiError::DeserializationError("login response carried no token".to_string()))?;
        session.sign_in(new_session)?;
        Ok(payload)
    }

    pub fn parse_list_todos(
        &self,
        session: &mut SessionContext,
        response: HttpResponse,
    ) -> Result<Vec<Todo>, ApiError> {
        match intercept(session, response)? {
            Value::Null => Ok(Vec::new()),
            value => decode(value),
        }
    }

    pub fn parse_create_todo(&self, session: &mut SessionContext, response: HttpResponse) -> Result<Todo, ApiError> {
        decode(intercept(session, response)?)
    }

    pub fn parse_update_todo(&self, session: &mut SessionContext, response: HttpResponse) -> Result<Todo, ApiError> {
        decode(intercept(session, response)?)
    }

    /// Parse a delete response. The server's answer varies (the removed todo,
    /// a message, or nothing), so it is returned untyped.
    pub fn parse_delete_todo(&self, session: &mut SessionContext, response: HttpResponse) -> Result<Value, ApiError> {
        intercept(session, response)
    }

    pub fn parse_delete_all_todos(
        &self,
        session: &mut SessionContext,
        response: HttpResponse,
    ) -> Result<Value, ApiError> {
        intercept(session, response)
    }

    /// Assemble a request for `path` (relative to the base URL) and attach
    /// the session token in both header forms.
    fn request(
        &self,
        session: &SessionContext,
        method: HttpMethod,
        path: String,
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = session.token() {
            headers.push((TOKEN_HEADER.to_string(), token.to_string()));
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        let path = format!("{}{path}", self.base_url);
        debug!("{method} {path}");
        HttpRequest {
            method,
            path,
            headers,
            body,
        }
    }
}

/// Response side of every call: pass 2xx through (envelope unwrapped), clear
/// the session on 401, surface everything else with the server's payload.
fn intercept(session: &mut SessionContext, response: HttpResponse) -> Result<Value, ApiError> {
    let payload = body_value(&response.body);
    if response.is_success() {
        return Ok(unwrap_envelope(payload));
    }
    if response.status == 401 {
        warn!("server answered 401, signing out");
        if let Err(err) = session.sign_out() {
            error!("couldn't clear session after 401: {err}");
        }
        return Err(ApiError::Unauthorized { payload });
    }
    Err(ApiError::Server {
        status: response.status,
        payload,
    })
}

/// Newer servers wrap payloads as `{"data": ...}`; older ones send the bare
/// payload. A falsy `data` (null, false, 0, "") falls back to the full body.
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if is_truthy(&data) => data,
            Some(data) => {
                map.insert("data".to_string(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Empty bodies read as `null`; bodies that aren't JSON are kept as strings.
fn body_value(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn remember(session: &mut SessionContext, payload: &AuthPayload) -> Result<(), ApiError> {
    if let Some(new_session) = Session::from_auth(payload.clone()) {
        session.sign_in(new_session)?;
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

fn to_json<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

//! In-memory stand-in for the remote todo API.
//!
//! Users register and log in by email; login hands out a uuid token that the
//! todo routes expect in `x-access-token` or `Authorization: Bearer`.
//! Payloads are wrapped as `{"success": true, "data": ...}` unless the
//! server runs in `Envelope::Legacy` mode, which sends them bare.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, post, put},
    Json, Router,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub completed_time: Option<i64>,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Full or partial todo as sent by the client. `completed_time` is only
/// applied together with `completed`.
#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub completed: Option<bool>,
    #[serde(default)]
    pub completed_time: Option<i64>,
}

#[derive(Deserialize)]
pub struct Owner {
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Response shape: current servers wrap payloads in `data`, older ones don't.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Envelope {
    Wrapped,
    Legacy,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<String, (User, String)>,
    tokens: HashMap<String, String>,
    todos: HashMap<String, Todo>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    envelope: Envelope,
}

/// Error answer: status plus `{"message": ...}`.
pub struct Failure(StatusCode, &'static str);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "success": false, "message": self.1 }))).into_response()
    }
}

pub fn app() -> Router {
    app_with(Envelope::Wrapped)
}

pub fn app_with(envelope: Envelope) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        envelope,
    };
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/todos", axum::routing::get(list_todos).post(create_todo))
        .route("/todos/delete/all", delete(delete_all_todos))
        .route("/todos/{id}", put(update_todo).delete(delete_todo))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Envelope::Wrapped).await
}

pub async fn run_with(listener: TcpListener, envelope: Envelope) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("mock todo API listening on {addr} ({envelope:?} responses)");
    }
    axum::serve(listener, app_with(envelope)).await
}

fn reply(state: &AppState, status: StatusCode, payload: Value) -> Response {
    let body = match state.envelope {
        Envelope::Wrapped => json!({ "success": true, "data": payload }),
        Envelope::Legacy => payload,
    };
    (status, Json(body)).into_response()
}

/// Token from `x-access-token`, else from `Authorization: Bearer`.
fn bearer(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers.get("x-access-token").and_then(|v| v.to_str().ok()) {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<String, Failure> {
    let token = bearer(headers).ok_or(Failure(StatusCode::UNAUTHORIZED, "No token provided"))?;
    let store = state.db.read().await;
    store
        .tokens
        .get(token)
        .cloned()
        .ok_or(Failure(StatusCode::UNAUTHORIZED, "Invalid token"))
}

fn issue_token(store: &mut Store, user: &User) -> String {
    let token = Uuid::new_v4().to_string();
    store.tokens.insert(token.clone(), user.id.clone());
    token
}

async fn register(State(state): State<AppState>, Json(input): Json<RegisterUser>) -> Result<Response, Failure> {
    let mut store = state.db.write().await;
    if store.users.contains_key(&input.email) {
        return Err(Failure(StatusCode::CONFLICT, "User already exists"));
    }
    let user = User {
        id: Uuid::new_v4().simple().to_string(),
        name: input.name,
        email: input.email.clone(),
    };
    let token = issue_token(&mut store, &user);
    store.users.insert(input.email, (user.clone(), input.password));
    debug!("registered user {}", user.id);
    Ok(reply(&state, StatusCode::CREATED, json!({ "token": token, "user": user })))
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginUser>) -> Result<Response, Failure> {
    let mut store = state.db.write().await;
    let user = match store.users.get(&input.email) {
        Some((user, password)) if *password == input.password => user.clone(),
        _ => return Err(Failure(StatusCode::BAD_REQUEST, "Invalid credentials")),
    };
    let token = issue_token(&mut store, &user);
    debug!("user {} logged in", user.id);
    Ok(reply(&state, StatusCode::OK, json!({ "token": token, "user": user })))
}

async fn list_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(owner): Query<Owner>,
) -> Result<Response, Failure> {
    authorize(&state, &headers).await?;
    let store = state.db.read().await;
    let mut todos: Vec<&Todo> = store.todos.values().filter(|t| t.user_id == owner.user_id).collect();
    todos.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(reply(&state, StatusCode::OK, json!(todos)))
}

async fn create_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(owner): Query<Owner>,
    Json(input): Json<CreateTodo>,
) -> Result<Response, Failure> {
    authorize(&state, &headers).await?;
    let todo = Todo {
        id: Uuid::new_v4().simple().to_string(),
        title: input.title,
        completed: input.completed,
        completed_time: None,
        user_id: owner.user_id,
    };
    state.db.write().await.todos.insert(todo.id.clone(), todo.clone());
    Ok(reply(&state, StatusCode::CREATED, json!(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodo>,
) -> Result<Response, Failure> {
    authorize(&state, &headers).await?;
    let mut store = state.db.write().await;
    let todo = store
        .todos
        .get_mut(&id)
        .ok_or(Failure(StatusCode::NOT_FOUND, "Todo not found"))?;
    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
        todo.completed_time = input.completed_time;
    }
    let todo = todo.clone();
    Ok(reply(&state, StatusCode::OK, json!(todo)))
}

async fn delete_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, Failure> {
    authorize(&state, &headers).await?;
    let removed = state
        .db
        .write()
        .await
        .todos
        .remove(&id)
        .ok_or(Failure(StatusCode::NOT_FOUND, "Todo not found"))?;
    Ok(reply(&state, StatusCode::OK, json!(removed)))
}

async fn delete_all_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(owner): Query<Owner>,
) -> Result<Response, Failure> {
    authorize(&state, &headers).await?;
    let mut store = state.db.write().await;
    let before = store.todos.len();
    store.todos.retain(|_, t| t.user_id != owner.user_id);
    let deleted = before - store.todos.len();
    Ok(reply(&state, StatusCode::OK, json!({ "deletedCount": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_serializes_with_mongo_style_keys() {
        let todo = Todo {
            id: "abc".to_string(),
            title: "Test".to_string(),
            completed: false,
            completed_time: None,
            user_id: "u1".to_string(),
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["_id"], "abc");
        assert_eq!(json["userId"], "u1");
        assert!(json["completed_time"].is_null());
    }

    #[test]
    fn create_todo_defaults_completed_to_false() {
        let input: CreateTodo = serde_json::from_str(r#"{"title":"No completed field"}"#).unwrap();
        assert_eq!(input.title, "No completed field");
        assert!(!input.completed);
    }

    #[test]
    fn update_todo_accepts_full_client_todo() {
        let input: UpdateTodo = serde_json::from_str(
            r#"{"_id":"1","title":"x","completed":true,"completed_time":1700000000000,"userId":"u1"}"#,
        )
        .unwrap();
        assert_eq!(input.completed, Some(true));
        assert_eq!(input.completed_time, Some(1_700_000_000_000));
    }

    #[test]
    fn bearer_prefers_custom_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-auth".parse().unwrap());
        assert_eq!(bearer(&headers), Some("from-auth"));
        headers.insert("x-access-token", "from-custom".parse().unwrap());
        assert_eq!(bearer(&headers), Some("from-custom"));
    }

    #[test]
    fn bearer_ignores_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer(&headers), None);
    }
}

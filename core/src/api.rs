//! One call per endpoint: build, execute, parse.
//!
//! `TodoApi` owns nothing but a `TodoClient` and a `Transport`; the session
//! context stays with the caller and is borrowed per call. A call that ends
//! in `ApiError::Unauthorized` has already signed the context out.

use serde_json::Value;

use crate::client::TodoClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::session::SessionContext;
use crate::transport::{Transport, UreqTransport};
use crate::types::{AuthPayload, LoginUser, NewTodo, RegisterUser, Todo};

#[derive(Clone)]
pub struct TodoApi<T = UreqTransport> {
    client: TodoClient,
    transport: T,
}

impl TodoApi<UreqTransport> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(TodoClient::new(&config.base_url), UreqTransport::new(config.timeout))
    }
}

impl<T: Transport> TodoApi<T> {
    pub fn with_transport(client: TodoClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    pub fn register(&self, session: &mut SessionContext, input: &RegisterUser) -> Result<AuthPayload, ApiError> {
        let response = self.send(self.client.build_register(session, input)?)?;
        self.client.parse_register(session, response)
    }

    pub fn login(&self, session: &mut SessionContext, input: &LoginUser) -> Result<AuthPayload, ApiError> {
        let response = self.send(self.client.build_login(session, input)?)?;
        self.client.parse_login(session, response)
    }

    /// Sign out locally. The server keeps no session state to revoke.
    pub fn logout(&self, session: &mut SessionContext) -> Result<bool, ApiError> {
        Ok(session.sign_out()?)
    }

    pub fn get_todos(&self, session: &mut SessionContext, user_id: Option<&str>) -> Result<Vec<Todo>, ApiError> {
        let user_id = owner(session, user_id)?;
        let response = self.send(self.client.build_list_todos(session, &user_id))?;
        self.client.parse_list_todos(session, response)
    }

    pub fn create_todo(
        &self,
        session: &mut SessionContext,
        input: &NewTodo,
        user_id: Option<&str>,
    ) -> Result<Todo, ApiError> {
        let user_id = owner(session, user_id)?;
        let response = self.send(self.client.build_create_todo(session, input, &user_id)?)?;
        self.client.parse_create_todo(session, response)
    }

    /// Send `todo` back with `completed_time` stamped from its completion
    /// flag. The caller's copy is stamped too.
    pub fn update_todo(&self, session: &mut SessionContext, todo: &mut Todo) -> Result<Todo, ApiError> {
        let now = chrono::Utc::now();
        todo.stamp_completion(now);
        let response = self.send(self.client.build_update_todo_at(session, todo, now)?)?;
        self.client.parse_update_todo(session, response)
    }

    pub fn delete_todo(&self, session: &mut SessionContext, id: &str) -> Result<Value, ApiError> {
        let response = self.send(self.client.build_delete_todo(session, id))?;
        self.client.parse_delete_todo(session, response)
    }

    pub fn delete_all_todos(&self, session: &mut SessionContext, user_id: Option<&str>) -> Result<Value, ApiError> {
        let user_id = owner(session, user_id)?;
        let response = self.send(self.client.build_delete_all_todos(session, &user_id))?;
        self.client.parse_delete_all_todos(session, response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(request).map_err(|e| {
            log::warn!("no response from server: {e}");
            ApiError::Transport(e)
        })
    }
}

/// Explicit owner id, or the one recorded in the session.
fn owner(session: &SessionContext, explicit: Option<&str>) -> Result<String, ApiError> {
    explicit
        .or_else(|| session.session().and_then(|s| s.user_id()))
        .map(str::to_string)
        .ok_or(ApiError::MissingUserId)
}

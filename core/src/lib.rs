//! Client layer for the todo web service.
//!
//! # Overview
//! Two pieces share one explicit `SessionContext`:
//! - `router`: the route table (`/`, `/login`, `/register`) and the guard
//!   that keeps anonymous users off the dashboard and signed-in users off
//!   the auth views.
//! - the API client: `TodoClient` builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network (host-does-IO),
//!   and `TodoApi` runs them through a `Transport` one endpoint per call.
//!
//! # Design
//! - Token headers are attached from the session passed to `build_*`.
//! - A 401 clears the session inside `parse_*` and comes back as
//!   `ApiError::Unauthorized`; navigating to `/login` is left to the caller
//!   via `ApiError::redirect`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod session;
pub mod transport;
pub mod types;

pub use api::TodoApi;
pub use client::TodoClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use router::{guard, Navigation, Route, RouteError, Router};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionContext, SessionError, SessionStore};
pub use transport::{Transport, UreqTransport};
pub use types::{AuthPayload, LoginUser, NewTodo, RegisterUser, Todo};

//! Route table and authentication guard.
//!
//! The guard is a pure decision over the target route and the session
//! context; it never touches storage. It only improves navigation, the API
//! still enforces access.

use std::fmt;

use crate::session::SessionContext;

/// Views the application can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/`, requires a session.
    Dashboard,
    Login,
    Register,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Dashboard, Route::Login, Route::Register];

    /// Match a URL path. Query strings, fragments and a trailing slash are
    /// ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Route::Dashboard),
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Login => "/login",
            Route::Register => "/register",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Login => "Login",
            Route::Register => "Register",
        }
    }

    pub fn requires_auth(self) -> bool {
        self == Route::Dashboard
    }

    /// Login and register, which make no sense once signed in.
    pub fn is_auth_view(self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a guarded navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allow(Route),
    Redirect(Route),
}

impl Navigation {
    /// The route that ends up displayed.
    pub fn destination(self) -> Route {
        match self {
            Navigation::Allow(route) | Navigation::Redirect(route) => route,
        }
    }

    pub fn is_redirect(self) -> bool {
        matches!(self, Navigation::Redirect(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    NotFound(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::NotFound(path) => write!(f, "no route matches {path}"),
        }
    }
}

impl std::error::Error for RouteError {}

/// Decide whether navigating to `target` is allowed for `session`.
pub fn guard(target: Route, session: &SessionContext) -> Navigation {
    let authenticated = session.is_authenticated();
    if target.requires_auth() && !authenticated {
        return Navigation::Redirect(Route::Login);
    }
    if target.is_auth_view() && authenticated {
        return Navigation::Redirect(Route::Dashboard);
    }
    Navigation::Allow(target)
}

/// Resolves paths to routes and applies the guard on every navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Router;

impl Router {
    pub fn new() -> Self {
        Router
    }

    pub fn resolve(&self, path: &str) -> Result<Route, RouteError> {
        Route::from_path(path).ok_or_else(|| RouteError::NotFound(path.to_string()))
    }

    pub fn navigate(&self, path: &str, session: &SessionContext) -> Result<Navigation, RouteError> {
        let target = self.resolve(path)?;
        let navigation = guard(target, session);
        if let Navigation::Redirect(to) = navigation {
            log::debug!("navigation to {target} redirected to {to}");
        }
        Ok(navigation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn signed_in() -> SessionContext {
        let mut ctx = SessionContext::in_memory();
        ctx.sign_in(Session::new("tok")).unwrap();
        ctx
    }

    #[test]
    fn dashboard_without_session_redirects_to_login() {
        let ctx = SessionContext::in_memory();
        assert_eq!(guard(Route::Dashboard, &ctx), Navigation::Redirect(Route::Login));
    }

    #[test]
    fn auth_views_with_session_redirect_to_dashboard() {
        let ctx = signed_in();
        assert_eq!(guard(Route::Login, &ctx), Navigation::Redirect(Route::Dashboard));
        assert_eq!(guard(Route::Register, &ctx), Navigation::Redirect(Route::Dashboard));
    }

    #[test]
    fn everything_else_is_allowed() {
        let anonymous = SessionContext::in_memory();
        assert_eq!(guard(Route::Login, &anonymous), Navigation::Allow(Route::Login));
        assert_eq!(guard(Route::Register, &anonymous), Navigation::Allow(Route::Register));
        assert_eq!(guard(Route::Dashboard, &signed_in()), Navigation::Allow(Route::Dashboard));
    }

    #[test]
    fn paths_round_trip_through_routes() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/login/"), Some(Route::Login));
        assert_eq!(Route::from_path("/login?next=%2F"), Some(Route::Login));
        assert_eq!(Route::from_path("/settings"), None);
    }

    #[test]
    fn navigate_rejects_unknown_paths() {
        let err = Router::new().navigate("/nope", &SessionContext::in_memory()).unwrap_err();
        assert_eq!(err, RouteError::NotFound("/nope".to_string()));
    }

    #[test]
    fn navigate_applies_guard() {
        let nav = Router::new().navigate("/", &SessionContext::in_memory()).unwrap();
        assert!(nav.is_redirect());
        assert_eq!(nav.destination(), Route::Login);
    }
}

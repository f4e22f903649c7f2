//! The top-level layer: keeps the current view, runs every navigation
//! through the router guard and turns `ApiError::redirect` into an actual
//! navigation.

use std::fmt;
use std::io::{self, Write};

use log::info;
use todo_client::{
    ApiError, LoginUser, Navigation, NewTodo, RegisterUser, Route, RouteError, Router, SessionContext,
    SessionError, Todo, TodoApi, Transport,
};

use crate::args::Command;

#[derive(Debug)]
pub enum CliError {
    Api(ApiError),
    Route(RouteError),
    Session(SessionError),
    Io(io::Error),

    /// The dashboard guard sent us to the login view.
    LoginRequired,

    /// No todo with this id belongs to the user.
    UnknownTodo(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Api(err) => write!(f, "{err}"),
            CliError::Route(err) => write!(f, "{err}"),
            CliError::Session(err) => write!(f, "{err}"),
            CliError::Io(err) => write!(f, "{err}"),
            CliError::LoginRequired => write!(f, "not logged in, run `todo login` first"),
            CliError::UnknownTodo(id) => write!(f, "no todo with id {id}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        CliError::Api(err)
    }
}

impl From<RouteError> for CliError {
    fn from(err: RouteError) -> Self {
        CliError::Route(err)
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        CliError::Session(err)
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Io(err)
    }
}

pub struct App<T: Transport> {
    api: TodoApi<T>,
    router: Router,
    session: SessionContext,
    user_id: Option<String>,
    view: Route,
}

impl<T: Transport> App<T> {
    pub fn new(api: TodoApi<T>, session: SessionContext, user_id: Option<String>) -> Self {
        Self {
            api,
            router: Router::new(),
            session,
            user_id,
            view: Route::Login,
        }
    }

    /// The view currently displayed.
    pub fn view(&self) -> Route {
        self.view
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn run(&mut self, command: Command, out: &mut impl Write) -> Result<(), CliError> {
        match command {
            Command::Register { name, email, password } => {
                if self.navigate(Route::Register.path())?.is_redirect() {
                    writeln!(out, "already logged in")?;
                    return Ok(());
                }
                let input = RegisterUser { name, email, password };
                let result = self.api.register(&mut self.session, &input);
                self.interpret(result)?;
                if self.session.is_authenticated() {
                    self.navigate(Route::Dashboard.path())?;
                    writeln!(out, "registered and logged in")?;
                } else {
                    writeln!(out, "registered, now run `todo login`")?;
                }
            }
            Command::Login { email, password } => {
                if self.navigate(Route::Login.path())?.is_redirect() {
                    writeln!(out, "already logged in")?;
                    return Ok(());
                }
                let input = LoginUser { email, password };
                let result = self.api.login(&mut self.session, &input);
                self.interpret(result)?;
                if self.navigate(Route::Dashboard.path())?.is_redirect() {
                    return Err(CliError::LoginRequired);
                }
                writeln!(out, "logged in")?;
            }
            Command::Logout => {
                let was_signed_in = self.api.logout(&mut self.session)?;
                self.view = Route::Login;
                writeln!(out, "{}", if was_signed_in { "logged out" } else { "not logged in" })?;
            }
            Command::Status => {
                let nav = self.navigate(Route::Dashboard.path())?;
                match self.session.session() {
                    Some(session) => writeln!(
                        out,
                        "logged in (user {})",
                        session.user_id().unwrap_or("unknown")
                    )?,
                    None => writeln!(out, "not logged in")?,
                }
                writeln!(out, "view: {}", nav.destination())?;
            }
            Command::Open { path } => {
                let nav = self.navigate(&path)?;
                match nav {
                    Navigation::Allow(route) => writeln!(out, "{} ({})", route, route.name())?,
                    Navigation::Redirect(route) => {
                        writeln!(out, "{} ({}), redirected from {path}", route, route.name())?
                    }
                }
            }
            Command::List => {
                self.enter_dashboard()?;
                let result = self.api.get_todos(&mut self.session, self.user_id.as_deref());
                let todos = self.interpret(result)?;
                if todos.is_empty() {
                    writeln!(out, "nothing to do")?;
                }
                for todo in &todos {
                    writeln!(out, "{}", render(todo))?;
                }
            }
            Command::Add { title } => {
                self.enter_dashboard()?;
                let input = NewTodo { title, completed: false };
                let result = self.api.create_todo(&mut self.session, &input, self.user_id.as_deref());
                let todo = self.interpret(result)?;
                writeln!(out, "{}", render(&todo))?;
            }
            Command::Done { id } => self.set_completed(&id, true, out)?,
            Command::Undo { id } => self.set_completed(&id, false, out)?,
            Command::Rm { id } => {
                self.enter_dashboard()?;
                let result = self.api.delete_todo(&mut self.session, &id);
                self.interpret(result)?;
                writeln!(out, "deleted {id}")?;
            }
            Command::Clear => {
                self.enter_dashboard()?;
                let result = self.api.delete_all_todos(&mut self.session, self.user_id.as_deref());
                let answer = self.interpret(result)?;
                match answer.get("deletedCount").and_then(|n| n.as_u64()) {
                    Some(n) => writeln!(out, "deleted {n} todos")?,
                    None => writeln!(out, "deleted all todos")?,
                }
            }
        }
        Ok(())
    }

    fn set_completed(&mut self, id: &str, completed: bool, out: &mut impl Write) -> Result<(), CliError> {
        self.enter_dashboard()?;
        let result = self.api.get_todos(&mut self.session, self.user_id.as_deref());
        let mut todo = self
            .interpret(result)?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| CliError::UnknownTodo(id.to_string()))?;
        todo.completed = completed;
        let result = self.api.update_todo(&mut self.session, &mut todo);
        let updated = self.interpret(result)?;
        writeln!(out, "{}", render(&updated))?;
        Ok(())
    }

    fn navigate(&mut self, path: &str) -> Result<Navigation, CliError> {
        let nav = self.router.navigate(path, &self.session)?;
        self.view = nav.destination();
        Ok(nav)
    }

    fn enter_dashboard(&mut self) -> Result<(), CliError> {
        match self.navigate(Route::Dashboard.path())? {
            Navigation::Allow(_) => Ok(()),
            Navigation::Redirect(_) => Err(CliError::LoginRequired),
        }
    }

    /// Follow the redirect an API error asks for, then hand the error on.
    fn interpret<V>(&mut self, result: Result<V, ApiError>) -> Result<V, CliError> {
        result.map_err(|err| {
            if let Some(route) = err.redirect() {
                info!("{err}, going to {route}");
                self.view = route;
            }
            CliError::Api(err)
        })
    }
}

fn render(todo: &Todo) -> String {
    let mark = if todo.completed { "x" } else { " " };
    let mut line = format!("[{mark}] {}  {}", todo.id, todo.title().unwrap_or("(untitled)"));
    if let Some(at) = todo.completed_time {
        line.push_str(&format!("  (done {})", at.format("%Y-%m-%d %H:%M")));
    }
    line
}

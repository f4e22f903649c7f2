use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Command-line front-end for the todo service")]
pub struct Args {
    /// Base URL of the todo API. Defaults to TODO_API_URL or the hosted
    /// service.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Where the session record is kept between runs.
    #[arg(long, global = true, env = "TODO_SESSION_FILE", default_value = ".todo-session.json")]
    pub session_file: PathBuf,

    /// Owner of the todos. Taken from the session when omitted.
    #[arg(long, global = true)]
    pub user_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the session state and the view `/` resolves to.
    Status,
    /// Navigate to a route, applying the auth guard.
    Open { path: String },
    List,
    Add { title: String },
    /// Mark a todo complete.
    Done { id: String },
    /// Mark a todo not complete.
    Undo { id: String },
    Rm { id: String },
    /// Delete every todo of the user.
    Clear,
}

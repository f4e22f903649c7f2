mod app;
mod args;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};
use todo_client::{ClientConfig, FileSessionStore, SessionContext, TodoApi};

use crate::app::App;
use crate::args::Args;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = args.api_url {
        config.base_url = url;
    }
    debug!("using API at {} (timeout {:?})", config.base_url, config.timeout);

    let session = match SessionContext::load_or_reset(FileSessionStore::new(&args.session_file)) {
        Ok(session) => session,
        Err(e) => {
            error!("couldn't load session from {}: {e}", args.session_file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new(TodoApi::from_config(&config), session, args.user_id);
    match app.run(args.command, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

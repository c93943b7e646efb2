use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod api;
mod config;
mod controller;
mod domain;
mod fetch;
mod inputter;
mod model;
mod nav;
mod pages;
mod records;
mod session;
mod ui;
mod view;

use api::ApiClient;
use config::{Args, Command, DeskConfig};
use controller::Controller;
use domain::DeskError;
use model::{Model, Status};
use session::{FileSessionStore, Session};

fn main() -> ExitCode {
    match start(Args::parse()) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

/// The terminal loop stays on this thread; requests run on the runtime's workers.
fn start(args: Args) -> Result<(), DeskError> {
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();
    run(args)
}

fn init_logging(config: &DeskConfig) -> Result<(), DeskError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    let filter = EnvFilter::try_from_env("PLANTDESK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .compact(),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| DeskError::Config(format!("cannot set up logging: {e}")))
}

fn run(mut args: Args) -> Result<(), DeskError> {
    let command = args.command.take();
    let config = args.into_config()?;
    init_logging(&config)?;

    let session = Session::new(Arc::new(FileSessionStore::new(config.session_file.clone())));
    session.restore()?;

    match command {
        Some(Command::Whoami) => {
            match session.user() {
                Some(user) => println!(
                    "{} ({}), employee {}, {}",
                    user.user_name, user.role, user.employee_id, user.department
                ),
                None => println!("Not logged in"),
            }
            return Ok(());
        }
        Some(Command::Logout) => {
            session.logout()?;
            println!("Logged out");
            return Ok(());
        }
        None => {}
    }

    info!("Starting plantdesk against {}", config.api_url);
    let api = ApiClient::new(&config.api_url, config.request_timeout, session)?;
    let mut model = Model::init(&config, api);
    let controller = Controller::new(&config);

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), DeskError> {
        while model.status != Status::Quitting {
            // Render the current view
            terminal.draw(|f| ui::draw(&model, f))?;

            // Handle events and map to a Message
            let message = controller.handle_event(&model)?;
            model.update(message)?;
            model.tick();
        }
        Ok(())
    })();
    ratatui::restore();
    info!("Bye");
    result
}

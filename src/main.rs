mod admin;
mod api;
mod cli;
mod commands;
mod config;
mod database;
mod error;
mod form;
mod gateway;
mod guard;
mod logging;
mod models;
mod notify;
mod resolve;
mod ui;
mod user;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use config::Settings;
use database::Database;
use logging::LogTarget;
use ui::{run_tui, SessionChange};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db = Database::new()?;
    let mut settings = Settings::load(&db)?;
    if let Some(api_base) = cli.api_base {
        settings.api_base = api_base;
    }

    let target = match cli.command {
        None | Some(Commands::Tui) => LogTarget::File(logging::default_log_file()),
        Some(_) => LogTarget::Stderr,
    };
    logging::init(settings.log_level, &target)?;

    match cli.command {
        Some(Commands::Config { action }) => {
            commands::run_config(&db, action)?;
        }
        Some(Commands::Completions { shell }) => {
            use clap_complete::generate;
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "taskflow", &mut std::io::stdout());
        }
        Some(Commands::Tui) | None => {
            // Default behavior: launch TUI
            let api = commands::connect(&db, &settings.api_base)?;
            run_tui(&api, |change| match change {
                SessionChange::SignedIn => commands::persist_session(&db, api.transport()),
                SessionChange::SignedOut => commands::end_session(&db, api.transport()),
            })?;
        }
        Some(command) => {
            let api = commands::connect(&db, &settings.api_base)?;
            let rt = tokio::runtime::Runtime::new()?;
            if !rt.block_on(commands::run(command, &api, &db))? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

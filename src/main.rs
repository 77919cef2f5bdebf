use anyhow::Result;

use late_league::cli::Command;
use late_league::{handle_completions, handle_export, handle_notify, handle_season, handle_serve, interpret};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Serve { port } => handle_serve(*port),
        Command::Season { action } => handle_season(action),
        Command::Notify => handle_notify(),
        Command::Export { output } => handle_export(output.as_deref()),
        Command::Completions { shell } => handle_completions(*shell),
    }
}

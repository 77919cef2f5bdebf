pub mod api;
pub mod archive;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod league;
pub mod rate_limiter;
pub mod services;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use cli::Cli;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::cli::{Command, SeasonCommand};
use crate::config::settings::AppConfig;
use crate::services::config::ConfigService;
use crate::services::export::ExportService;
use crate::services::notifications::NotificationService;
use crate::services::open_store;
use crate::services::season::{SeasonOutcome, SeasonService};
use crate::services::server::ServerService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let service = ServerService::new(port, config);
        service.run().await
    })
}

pub fn handle_season(command: &SeasonCommand) -> Result<()> {
    let settings = AppConfig::new();
    let pool = open_store(&settings)?;
    let config = Arc::new(ConfigService::new(pool.clone()));
    config.initialize()?;
    let seasons = SeasonService::new(pool, config, &settings.storage.archive_dir);

    let now = Utc::now();
    let outcome = match command {
        SeasonCommand::New { idempotency_key } => seasons.start_new_season(now, idempotency_key.as_deref()),
        SeasonCommand::DistributeRewards { idempotency_key } => {
            seasons.distribute_rewards(now, idempotency_key.as_deref())
        }
        SeasonCommand::Reset {
            confirm,
            idempotency_key,
        } => seasons.reset_season_data(confirm, now, idempotency_key.as_deref()),
    }?;

    print_outcome(&outcome);
    Ok(())
}

pub fn handle_notify() -> Result<()> {
    let settings = AppConfig::new();
    let pool = open_store(&settings)?;
    let config = Arc::new(ConfigService::new(pool.clone()));
    config.initialize()?;
    let service = NotificationService::new(pool, config, &settings.webhook)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(service.dispatch_pending())?;

    if !report.enabled {
        println!("{}", format!("Webhooks disabled, {} notifications pending", report.remaining).yellow());
    } else if report.failed > 0 {
        println!(
            "{}",
            format!("{} sent, {} failed, {} pending", report.sent, report.failed, report.remaining).red()
        );
    } else {
        println!("{}", format!("{} sent, {} pending", report.sent, report.remaining).green());
    }
    Ok(())
}

pub fn handle_export(output: Option<&Path>) -> Result<()> {
    let settings = AppConfig::new();
    let pool = open_store(&settings)?;
    let service = ExportService::from_settings(pool, &settings.export);

    let runtime = tokio::runtime::Runtime::new()?;
    let artifact = runtime.block_on(service.export(Utc::now()))?;

    let path = output.map_or_else(|| Path::new(&artifact.file_name).to_path_buf(), Path::to_path_buf);
    std::fs::write(&path, &artifact.bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{}",
        format!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len()).green()
    );
    Ok(())
}

pub fn handle_completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

fn print_outcome(outcome: &SeasonOutcome) {
    if outcome.replayed {
        println!("{} {}", "Already done:".yellow(), outcome.message);
    } else {
        println!("{}", outcome.message.green());
    }
}

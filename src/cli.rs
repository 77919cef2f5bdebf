use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Late League admin backend")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Start the backend server
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Run a season lifecycle action
    Season {
        #[clap(subcommand)]
        action: SeasonCommand,
    },
    /// Deliver pending reward notifications to the configured webhook
    Notify,
    /// Write a database export to a file
    Export {
        /// Output file (defaults to the generated export name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum SeasonCommand {
    /// Advance to the next season and apply the configured MMR reset
    New {
        /// Replays the earlier result instead of running twice
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Grant end-of-season rewards to active players
    DistributeRewards {
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Archive match history and wipe all season data
    Reset {
        /// Must be RESET
        #[arg(long)]
        confirm: String,
        #[arg(long)]
        idempotency_key: Option<String>,
    },
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// CLI argument definitions for the finance-ops analysis and suggestion engine.

#[derive(Parser)]
#[command(name = "finance-ops")]
#[command(about = "Personal finance signal detection and suggestion lifecycle engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Seed an in-memory store with demo data and print a new user id
    Init,

    /// Run the full signal-analysis pass for a user and print what fired
    Analyze {
        /// User to analyze
        #[arg(long)]
        user: String,
    },

    /// Run the scheduler loop in the foreground until interrupted
    Scheduler {
        #[command(subcommand)]
        command: SchedulerCommands,
    },

    /// Inspect stored financial signals
    Signals {
        #[command(subcommand)]
        command: SignalsCommands,
    },

    /// Inspect pending suggestions
    Suggestions {
        #[command(subcommand)]
        command: SuggestionsCommands,
    },
}

#[derive(Subcommand)]
pub enum SchedulerCommands {
    /// Start the weekly-tick / daily-sweep loop and block
    Run,

    /// Re-run weekly summary generation for every known user as of N days ago
    Retry {
        #[arg(long, default_value = "7")]
        days_back: i64,
    },
}

#[derive(Subcommand)]
pub enum SignalsCommands {
    /// List active signals for a user
    List {
        #[arg(long)]
        user: String,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        output: String,
    },
}

#[derive(Subcommand)]
pub enum SuggestionsCommands {
    /// List pending suggestions for a user
    List {
        #[arg(long)]
        user: String,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        output: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

pub mod commands;
pub mod config;
pub mod context;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "taskdesk")]
#[command(about = "Taskdesk CLI - command-line client for the task management API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "API root to use for this invocation")]
    pub api_root: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Task operations")]
    Tasks {
        #[command(subcommand)]
        cmd: commands::tasks::TaskCommands,
    },

    #[command(about = "User administration")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Show the task dashboard")]
    Dashboard,

    #[command(about = "Client configuration")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let api_root = cli.api_root.as_deref();

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, api_root, output_format).await,
        Commands::Tasks { cmd } => commands::tasks::handle(cmd, api_root, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, api_root, output_format).await,
        Commands::Dashboard => commands::dashboard::handle(api_root, output_format).await,
        Commands::Config { cmd } => commands::config::handle(cmd, api_root, output_format).await,
    }
}

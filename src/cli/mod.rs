pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "learnhub-access")]
#[command(about = "LearnHub access service - department roles, sessions and admin escalation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP service")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides API_PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Serve from a YAML fixture file instead of Postgres")]
        fixtures: Option<PathBuf>,
    },

    #[command(about = "Validate a YAML role catalog")]
    CheckCatalog {
        #[arg(help = "Path to the catalog file")]
        file: PathBuf,
    },

    #[command(about = "Print an argon2 hash for seeding credentials")]
    HashPassword {
        #[arg(help = "Password to hash (read from stdin when omitted)")]
        password: Option<String>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, fixtures } => commands::serve::handle(port, fixtures).await,
        Commands::CheckCatalog { file } => commands::catalog::handle(&file),
        Commands::HashPassword { password } => commands::password::handle(password),
    }
}

//! # Ragnet CLI (`ragnet`)
//!
//! ## Usage
//!
//! ```bash
//! ragnet --config ./config/ragnet.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragnet init` | Create the SQLite database and schema |
//! | `ragnet serve` | Start the HTTP server |
//! | `ragnet ask "<query>"` | Print the canned answer for a query |
//! | `ragnet repos` | Print the demo repository catalog |
//!
//! A missing config file is not an error: every setting has a default.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ragnet::{config, logging, migrate, query, repos, server};

/// Ragnet — a chat-style backend over ingested documentation repositories.
#[derive(Parser)]
#[command(
    name = "ragnet",
    about = "Ragnet — a chat-style backend over ingested documentation repositories",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ragnet.toml`. When the file does not exist,
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/ragnet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the organizations, sources,
    /// conversations, and messages tables. Idempotent.
    Init,

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves the Ragnet API.
    Serve,

    /// Print the canned answer for a query.
    Ask {
        /// The question to answer.
        query: String,
    },

    /// List the demo repositories.
    Repos,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    logging::init_tracing(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { query } => {
            query::run_ask(&query)?;
        }
        Commands::Repos => {
            repos::run_list_repos()?;
        }
    }

    Ok(())
}

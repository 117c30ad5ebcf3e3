//! AutoLearn CLI: the main entry point.
//!
//! Commands:
//! - `learn`   : Start a learning session on a topic
//! - `resume`  : Continue an interrupted session
//! - `history` : List past sessions
//! - `show`    : Show one session in detail
//! - `delete`  : Forget a session
//! - `config`  : Print the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "autolearn",
    about = "AutoLearn: adaptive learning sessions with quizzes and remediation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new learning session
    Learn {
        /// What to study
        #[arg(short, long)]
        topic: String,

        /// A learning objective (repeatable)
        #[arg(short, long = "objective")]
        objectives: Vec<String>,

        /// A success criterion (repeatable)
        #[arg(short, long = "criterion")]
        criteria: Vec<String>,
    },

    /// Continue a session from its last checkpoint
    Resume {
        /// Session id
        id: String,
    },

    /// List past sessions, newest first
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a session in detail
    Show {
        /// Session id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a session and its checkpoint
    Delete {
        /// Session id
        id: String,
    },

    /// Print the effective configuration
    Config {
        /// Print only the config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Learn {
            topic,
            objectives,
            criteria,
        } => commands::learn::run(topic, objectives, criteria).await?,
        Commands::Resume { id } => commands::resume::run(&id).await?,
        Commands::History { json } => commands::history::run(json).await?,
        Commands::Show { id, json } => commands::show::run(&id, json).await?,
        Commands::Delete { id } => commands::delete::run(&id).await?,
        Commands::Config { path } => {
            if path {
                commands::config_cmd::path().await?
            } else {
                commands::config_cmd::show().await?
            }
        }
    }

    Ok(())
}

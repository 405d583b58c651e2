//! Elicit - clarify requirements with a reasoning engine that asks back
//!
//! Entry point for the `elicit` binary: an interactive terminal session in
//! which the engine interviews the operator about a user story.

mod cli;

use clap::{Parser, Subcommand};
use cli::chat::ChatOptions;
use cli::config::ConfigAction;
use elicit_core::{error::Result, ElicitConfig};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "elicit")]
#[command(about = "Clarify user stories with a reasoning engine that asks questions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Configuration file (defaults to .elicit/config.toml)
    #[arg(long, env = "ELICIT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive clarification session
    Chat {
        /// File holding the user story to clarify
        #[arg(short, long)]
        story: Option<PathBuf>,

        /// File holding the business context
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Use the offline scripted engine instead of the LLM
        #[arg(long)]
        scripted: bool,

        /// Write the session transcript as JSON on exit
        #[arg(short, long)]
        transcript: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Use the requested level for our crates, keep HTTP internals quiet
    let filter = EnvFilter::new(format!(
        "elicit={lvl},elicit_core={lvl},reqwest=warn,hyper=warn",
        lvl = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Elicit v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.unwrap_or_else(ElicitConfig::default_path);

    match cli.command {
        Commands::Chat {
            story,
            context,
            scripted,
            transcript,
        } => {
            let config = ElicitConfig::load(&config_path)?;
            cli::chat::run(
                &config,
                ChatOptions {
                    story,
                    context,
                    scripted,
                    transcript,
                },
            )
            .await
        }
        Commands::Config { action } => cli::config::handle(action, &config_path).await,
    }
}

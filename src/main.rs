//! Fitrec - administrative CLI for the fitness goal recommender
//!
//! Operators use it to query recommendations, record ratings, trigger or force
//! a retrain, and inspect the active model and its retraining history.

mod cli;

use clap::{Parser, Subcommand};
use fitrec_core::error::Result;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

use cli::feedback::FeedbackArgs;
use cli::helpers::{load_config, ProfileArgs};

#[derive(Parser)]
#[command(name = "fitrec")]
#[command(about = "Feedback-driven fitness goal recommender", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Data directory (overrides the config file's data_dir)
    #[arg(long, env = "FITREC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data_dir>/fitrec.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a goal and programs for a profile
    Recommend {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Record a rating of a recommendation
    Feedback(FeedbackArgs),

    /// Retrain if the trigger policy allows it
    Retrain {
        /// Ignore the feedback-count and cooldown thresholds
        #[arg(long)]
        force: bool,
    },

    /// Show the active model and feedback totals
    Info {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the retraining log
    History {
        /// Show at most this many of the latest entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "fitrec={level},fitrec_core={level}",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // keep stdout for command output
        .init();

    debug!("Fitrec v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Commands::InitConfig { force } = cli.command {
        return cli::init::handle(cli.data_dir, cli.config, force).await;
    }

    let config = load_config(cli.data_dir, cli.config)?;
    debug!("Data directory: {}", config.data_dir.display());

    match cli.command {
        Commands::Recommend { profile, json } => cli::recommend::handle(config, profile, json).await,
        Commands::Feedback(args) => cli::feedback::handle(config, args).await,
        Commands::Retrain { force } => cli::retrain::handle(config, force).await,
        Commands::Info { json } => cli::info::handle_info(config, json).await,
        Commands::History { limit } => cli::info::handle_history(config, limit).await,
        Commands::InitConfig { .. } => Ok(()),
    }
}

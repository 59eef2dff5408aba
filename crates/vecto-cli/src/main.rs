//! Vecto CLI - mirror repositories between hosting platforms.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::Overrides;
use logging::LogFormat;

/// Vecto - VCS migration tool
#[derive(Parser, Debug)]
#[command(name = "vecto")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: config.yml, config.yaml or utils/config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// Repositories migrated at the same time
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Timeout for each git step, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate every repository in the map
    Migrate {
        /// Do not render a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Generate a repository map from the source inventory
    GenerateMap {
        /// Source project to list
        #[arg(short, long)]
        project: String,
        /// Output path (default: repos.map from the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the configuration and provider options
    Validate,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_logging(logging::level_for(cli.verbose), cli.log_format);

    let overrides = Overrides {
        concurrency: cli.concurrency,
        timeout_secs: cli.timeout_secs,
    };
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Migrate { no_progress } => {
            commands::migrate(config, &overrides, !no_progress).await
        }
        Commands::GenerateMap { project, output } => {
            commands::generate_map(config, &overrides, &project, output)
                .await
                .map(|()| true)
        }
        Commands::Validate => commands::validate(config, &overrides).map(|()| true),
        Commands::Version => {
            println!("vecto {}", vecto_migrate::VERSION);
            Ok(true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

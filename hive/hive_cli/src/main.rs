use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hive_actor::SystemConfig;
use hive_core::utils::LogLevel;

mod commands;

/// Hive Command Line Interface
///
/// Runs batches of actors on the Hive engine and inspects its configuration.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[clap(long, global = true)]
    log_level: Option<LogLevel>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create actors, send them messages and report the replies
    Run(commands::run::RunArgs),

    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => SystemConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SystemConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(config.log_level);

    match cli.command {
        Commands::Run(args) => commands::run::execute(&args, config),
        Commands::Config => commands::config::execute(&config),
    }
}

/// Log to stderr at `level`; `RUST_LOG` still takes precedence.
fn init_logging(level: LogLevel) {
    let _ = env_logger::Builder::new()
        .filter_level(level.into())
        .parse_default_env()
        .try_init();
}

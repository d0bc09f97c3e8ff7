//! # Pottysnitch CLI
//!
//! Runs the location API server and offers a few maintenance commands for the location store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "pottysnitch")]
#[command(version)]
#[command(about = "Crowd-sourced map of publicly accessible restrooms", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Backing JSON file for submissions
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Built front-end directory to serve
        #[arg(short, long)]
        static_dir: Option<PathBuf>,

        /// Reject incomplete or out-of-range submissions
        #[arg(long)]
        strict: bool,

        /// Keep submissions in memory only
        #[arg(long, conflicts_with = "data")]
        ephemeral: bool,
    },

    /// Inspect or extend the location store
    Locations {
        #[command(subcommand)]
        action: LocationsAction,
    },

    /// Display version and build info
    Version,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum LocationsAction {
    /// List stored locations
    List {
        /// Backing JSON file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Append a submission read from a file or stdin
    Add {
        /// JSON file holding one submission (stdin if omitted)
        file: Option<PathBuf>,

        /// Backing JSON file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Validate before saving
        #[arg(long)]
        strict: bool,
    },

    /// Print the number of stored locations
    Count {
        /// Backing JSON file
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let telemetry_config = pottysnitch_telemetry::TelemetryConfig::new("pottysnitch")
        .with_log_level(&cli.log_level);

    let telemetry_config = if cli.json_logs {
        telemetry_config.with_json_logs()
    } else {
        telemetry_config
    };

    pottysnitch_telemetry::init_logging(&telemetry_config)?;

    let cfg = config::Config::load();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data,
            static_dir,
            strict,
            ephemeral,
        } => {
            let opts = commands::ServeOptions {
                host,
                port,
                data,
                static_dir,
                strict,
                ephemeral,
            };
            commands::serve(&cfg, opts).await?;
        },

        Commands::Locations { action } => match action {
            LocationsAction::List { data, json } => {
                commands::locations_list(&cfg, data, json).await?;
            },
            LocationsAction::Add { file, data, strict } => {
                commands::locations_add(&cfg, file, data, strict).await?;
            },
            LocationsAction::Count { data } => commands::locations_count(&cfg, data).await?,
        },

        Commands::Version => {
            commands::version();
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                config::show_config();
            },
            ConfigAction::Init { force } => {
                commands::config_init(force)?;
            },
            ConfigAction::Path => {
                println!("{}", config::Config::config_path().display());
            },
        },
    }

    Ok(())
}

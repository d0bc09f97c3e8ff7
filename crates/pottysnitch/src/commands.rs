//! CLI command implementations.

use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::eyre::{eyre, Result, WrapErr};
use pottysnitch_core::{validate, LocationSubmission};
use pottysnitch_server::{Server, ServerConfig};
use pottysnitch_store::{InMemoryStore, JsonFileStore, LocationStore};

use crate::config::Config;

/// Command-line overrides for `serve`.
#[derive(Debug, Default)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub strict: bool,
    pub ephemeral: bool,
}

/// Merges configuration with command-line overrides.
pub fn server_config(cfg: &Config, opts: &ServeOptions) -> Result<ServerConfig> {
    let host = opts.host.as_deref().unwrap_or(&cfg.server_host);
    let port = opts.port.unwrap_or(cfg.server_port);
    let addr = format!("{host}:{port}")
        .parse::<SocketAddr>()
        .wrap_err_with(|| format!("invalid listen address {host}:{port}"))?;

    let mut builder = ServerConfig::builder()
        .addr(addr)
        .cors(cfg.cors)
        .data_path(opts.data.clone().unwrap_or_else(|| cfg.data_path.clone()))
        .strict_validation(opts.strict || cfg.strict_validation)
        .map_keys(cfg.map_keys());

    if let Some(dir) = opts.static_dir.as_ref().or(cfg.static_dir.as_ref()) {
        builder = builder.static_dir(dir.clone());
    }

    Ok(builder.build())
}

/// Start the API server.
pub async fn serve(cfg: &Config, opts: ServeOptions) -> Result<()> {
    tracing::info!("Starting pottysnitch server...");

    let config = server_config(cfg, &opts)?;
    if let Some(dir) = &config.static_dir {
        if !dir.is_dir() {
            return Err(eyre!("front-end directory {} does not exist", dir.display()));
        }
    }

    let server = if opts.ephemeral {
        tracing::warn!("Using an in-memory store; submissions are lost on shutdown");
        Server::with_store(config, Arc::new(InMemoryStore::new()))
    } else {
        Server::new(config)
    };

    server.run().await?;
    Ok(())
}

fn open_store(cfg: &Config, data: Option<PathBuf>) -> JsonFileStore {
    JsonFileStore::new(data.unwrap_or_else(|| cfg.data_path.clone()))
}

/// Print every stored location.
pub async fn locations_list(cfg: &Config, data: Option<PathBuf>, json: bool) -> Result<()> {
    let store = open_store(cfg, data);
    let locations = store
        .read_all()
        .await
        .wrap_err_with(|| format!("failed to read {}", store.describe()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&locations)?);
        return Ok(());
    }

    if locations.is_empty() {
        println!("No locations submitted yet.");
        return Ok(());
    }

    for (index, location) in locations.iter().enumerate() {
        println!("{}", format_location(index, location));
    }
    println!("\n{} location(s)", locations.len());

    Ok(())
}

/// One line per location for terminal output.
pub fn format_location(index: usize, location: &LocationSubmission) -> String {
    let name = location.name().unwrap_or("(unnamed)");
    let address = location.formatted_address().unwrap_or("(no address)");
    let coordinate = location
        .coordinate()
        .map_or_else(|| "(no coordinate)".to_string(), |c| c.to_string());

    let mut line = format!(
        "{:>4}  {:<8}  {:<24}  {name} | {address}",
        index + 1,
        location.status().to_string(),
        coordinate
    );
    if let Some(category) = location.category() {
        line.push_str(&format!(" [{category}]"));
    }
    line
}

/// Reads a submission from a file, or stdin when no file is given.
pub fn read_submission(source: Option<&Path>) -> Result<LocationSubmission> {
    let bytes = match source {
        Some(path) => {
            std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?
        },
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .wrap_err("failed to read stdin")?;
            buf
        },
    };

    Ok(LocationSubmission::from_json_slice(&bytes)?)
}

/// Append one submission to the store.
pub async fn locations_add(
    cfg: &Config,
    file: Option<PathBuf>,
    data: Option<PathBuf>,
    strict: bool,
) -> Result<()> {
    let submission = read_submission(file.as_deref())?;
    if strict || cfg.strict_validation {
        validate(&submission)?;
    }

    let store = open_store(cfg, data);
    let name = submission.name().unwrap_or("(unnamed)").to_string();
    let count = store
        .append(submission)
        .await
        .wrap_err_with(|| format!("failed to save to {}", store.describe()))?;

    println!("Saved {name}. The store now holds {count} location(s).");
    Ok(())
}

/// Print the number of stored locations.
pub async fn locations_count(cfg: &Config, data: Option<PathBuf>) -> Result<()> {
    let store = open_store(cfg, data);
    println!("{}", store.count().await?);
    Ok(())
}

/// Write the default configuration file.
pub fn config_init(force: bool) -> Result<()> {
    let path = Config::config_path();
    if path.exists() && !force {
        return Err(eyre!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }

    Config::default().save_to(&path)?;
    println!("Config written to: {}", path.display());
    Ok(())
}

/// Display version information.
pub fn version() {
    println!("pottysnitch {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Components:");
    println!("  pottysnitch-core       - Location records and validation");
    println!("  pottysnitch-store      - Append-only JSON store");
    println!("  pottysnitch-server     - HTTP API and front-end host");
    println!("  pottysnitch-telemetry  - Logging and counters");
}

//! Configuration management for the pottysnitch CLI.
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Command-line arguments
//! 2. Environment variables (POTTYSNITCH_*)
//! 3. Front-end build variables (VITE_PUBLIC_GEOAPIFY_API_KEY, VITE_PUBLIC_MAPTILER_API_KEY)
//! 4. Config file (~/.config/pottysnitch/config.toml)
//! 5. Default values

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use pottysnitch_server::MapKeys;
use pottysnitch_store::DEFAULT_DATA_PATH;
use serde::{Deserialize, Serialize};

/// Front-end variables that carry the public map keys.
const FRONT_END_KEYS: [&str; 2] = ["VITE_PUBLIC_GEOAPIFY_API_KEY", "VITE_PUBLIC_MAPTILER_API_KEY"];

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server host.
    #[serde(default = "default_host")]
    pub server_host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Backing file for submitted locations.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Built front-end to serve alongside the API.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Reject incomplete or out-of-range submissions.
    #[serde(default)]
    pub strict_validation: bool,

    /// Enable permissive CORS.
    #[serde(default = "default_cors")]
    pub cors: bool,

    /// Geoapify key handed to the front-end.
    #[serde(default)]
    pub geoapify_api_key: Option<String>,

    /// MapTiler key handed to the front-end.
    #[serde(default)]
    pub maptiler_api_key: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_cors() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_host(),
            server_port: default_port(),
            data_path: default_data_path(),
            static_dir: None,
            strict_validation: false,
            cors: default_cors(),
            geoapify_api_key: None,
            maptiler_api_key: None,
        }
    }
}

impl Config {
    /// Loads configuration from all sources.
    ///
    /// Reports warnings for configuration errors but falls back to defaults.
    pub fn load() -> Self {
        let config_path = Self::config_path();

        match Self::figment(&config_path).extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("\x1b[33mWarning:\x1b[0m Configuration error, using defaults");
                eprintln!("  Config file: {}", config_path.display());
                eprintln!("  Error: {e}");
                eprintln!();
                eprintln!("  To fix, edit or delete the config file:");
                eprintln!("    rm {}", config_path.display());
                eprintln!();
                Config::default()
            },
        }
    }

    /// Layers every configuration source over the defaults.
    pub fn figment(config_path: &Path) -> Figment {
        let front_end_keys = Env::raw().only(&FRONT_END_KEYS).map(|key| {
            key.as_str()
                .to_ascii_lowercase()
                .trim_start_matches("vite_public_")
                .to_string()
                .into()
        });

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(front_end_keys)
            .merge(Env::prefixed("POTTYSNITCH_"))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Returns the path to the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pottysnitch")
    }

    /// Writes this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let toml_str = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, toml_str)
    }

    /// Public map keys for the front-end.
    pub fn map_keys(&self) -> MapKeys {
        MapKeys {
            geoapify_api_key: self.geoapify_api_key.clone(),
            maptiler_api_key: self.maptiler_api_key.clone(),
        }
    }
}

fn mask(key: Option<&str>) -> String {
    match key {
        None | Some("") => "(not set)".to_string(),
        Some(k) if k.chars().count() <= 4 => "****".to_string(),
        Some(k) => {
            let tail: String = k.chars().skip(k.chars().count() - 4).collect();
            format!("****{tail}")
        },
    }
}

/// Prints the current configuration and its sources.
pub fn show_config() {
    let config = Config::load();
    let config_path = Config::config_path();

    println!("Pottysnitch Configuration");
    println!("=========================\n");

    println!("Config file: {}", config_path.display());
    if config_path.exists() {
        println!("Status: Found\n");
    } else {
        println!("Status: Not found (using defaults)\n");
    }

    println!("Current settings:");
    println!("  server_host: {}", config.server_host);
    println!("  server_port: {}", config.server_port);
    println!("  data_path: {}", config.data_path.display());
    println!(
        "  static_dir: {}",
        config
            .static_dir
            .as_ref()
            .map_or_else(|| "(not set)".to_string(), |d| d.display().to_string())
    );
    println!("  strict_validation: {}", config.strict_validation);
    println!("  cors: {}", config.cors);
    println!("  geoapify_api_key: {}", mask(config.geoapify_api_key.as_deref()));
    println!("  maptiler_api_key: {}", mask(config.maptiler_api_key.as_deref()));

    println!("\nEnvironment variables:");
    println!("  POTTYSNITCH_SERVER_HOST");
    println!("  POTTYSNITCH_SERVER_PORT");
    println!("  POTTYSNITCH_DATA_PATH");
    println!("  POTTYSNITCH_STATIC_DIR");
    println!("  POTTYSNITCH_STRICT_VALIDATION");
    println!("  POTTYSNITCH_CORS");
    println!("  POTTYSNITCH_GEOAPIFY_API_KEY (or VITE_PUBLIC_GEOAPIFY_API_KEY)");
    println!("  POTTYSNITCH_MAPTILER_API_KEY (or VITE_PUBLIC_MAPTILER_API_KEY)");
}

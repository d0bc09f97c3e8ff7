//! HTTP server: configuration, shared state, routing and lifecycle.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use pottysnitch_core::Result;
use pottysnitch_store::{JsonFileStore, LocationStore, DEFAULT_DATA_PATH};
use pottysnitch_telemetry::ApiMetrics;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Public API keys handed to the front-end for map tiles and geocoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapKeys {
    /// Geoapify geocoding key.
    pub geoapify_api_key: Option<String>,
    /// MapTiler tiles key.
    pub maptiler_api_key: Option<String>,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// Enable CORS.
    pub cors: bool,
    /// Backing file for the JSON store.
    pub data_path: PathBuf,
    /// Directory of the built front-end, served for every non-API path.
    pub static_dir: Option<PathBuf>,
    /// Reject submissions that fail [`pottysnitch_core::validate`].
    pub strict_validation: bool,
    /// Keys exposed at `/api/map-config`.
    pub map_keys: MapKeys,
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            cors: true,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            static_dir: None,
            strict_validation: false,
            map_keys: MapKeys::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a new server config builder.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    addr: Option<SocketAddr>,
    cors: Option<bool>,
    data_path: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    strict_validation: Option<bool>,
    map_keys: Option<MapKeys>,
}

impl ServerConfigBuilder {
    /// Sets the listen address.
    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Sets whether CORS is enabled.
    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = Some(enabled);
        self
    }

    /// Sets the backing file of the store.
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Sets the front-end directory.
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Sets whether submissions are validated.
    pub fn strict_validation(mut self, enabled: bool) -> Self {
        self.strict_validation = Some(enabled);
        self
    }

    /// Sets the map API keys.
    pub fn map_keys(mut self, keys: MapKeys) -> Self {
        self.map_keys = Some(keys);
        self
    }

    /// Builds the server config.
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr.unwrap_or_else(default_addr),
            cors: self.cors.unwrap_or(true),
            data_path: self
                .data_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            static_dir: self.static_dir,
            strict_validation: self.strict_validation.unwrap_or(false),
            map_keys: self.map_keys.unwrap_or_default(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Location storage.
    pub store: Arc<dyn LocationStore>,
    /// Server configuration.
    pub config: ServerConfig,
    /// Request counters.
    pub metrics: ApiMetrics,
    /// Server start time.
    pub start_time: Instant,
}

impl AppState {
    /// Creates app state over the given store.
    pub fn new(config: ServerConfig, store: Arc<dyn LocationStore>) -> Self {
        Self {
            store,
            config,
            metrics: ApiMetrics::new(),
            start_time: Instant::now(),
        }
    }
}

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Creates a server that persists to the JSON file named in the config.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(JsonFileStore::new(config.data_path.clone()));
        Self::with_store(config, store)
    }

    /// Creates a server over any store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn LocationStore>) -> Self {
        let state = Arc::new(AppState::new(config.clone(), store));
        Self { config, state }
    }

    /// Returns the shared state.
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Creates the router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/status", get(handlers::server_status))
            .route("/api/map-config", get(handlers::map_config))
            .route(
                "/api/locations",
                get(handlers::list_locations).post(handlers::submit_location),
            )
            .with_state(self.state());

        if let Some(dir) = &self.config.static_dir {
            let not_found = ServeFile::new(dir.join("404.html"));
            router = router.fallback_service(ServeDir::new(dir).not_found_service(not_found));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.cors {
            router = router.layer(CorsLayer::permissive());
        }

        router
    }

    /// Runs the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot start.
    pub async fn run(self) -> Result<()> {
        match self.state.store.count().await {
            Ok(count) => {
                tracing::info!(store = %self.state.store.describe(), count, "Location store ready");
            },
            Err(e) => {
                tracing::warn!(
                    store = %self.state.store.describe(),
                    error = %e,
                    "Location store is unreadable; requests will fail until it is repaired"
                );
            },
        }

        if let Some(dir) = &self.config.static_dir {
            tracing::info!(dir = %dir.display(), "Serving front-end");
        }

        let router = self.router();

        tracing::info!(addr = %self.config.addr, "Starting pottysnitch server");
        eprintln!(
            "\n\x1b[32m✓\x1b[0m Server listening on http://{}",
            self.config.addr
        );
        eprintln!("  Press Ctrl+C to stop\n");

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        eprintln!("\x1b[32m✓\x1b[0m Server stopped");

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            eprintln!("\n\x1b[33m⚡\x1b[0m Received Ctrl+C, shutting down gracefully...");
        },
        () = terminate => {
            eprintln!("\n\x1b[33m⚡\x1b[0m Received SIGTERM, shutting down gracefully...");
        },
    }
}

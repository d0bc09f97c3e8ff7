//! # Pottysnitch Server
//!
//! HTTP API for listing and submitting locations, plus hosting of the static map front-end.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, MapKeys, Server, ServerConfig};

//! # Pottysnitch Store
//!
//! Persistence for submitted locations.
//!
//! The store is an ordered, append-only list of submissions behind the narrow
//! [`LocationStore`] trait, so callers never see how records are kept.
//!
//! ## Backends
//!
//! - **JSON file**: the whole list lives in one JSON array on disk and is rewritten atomically
//!   on every append
//! - **In memory**: a process-local list for tests and throwaway servers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod store;

pub use file::{JsonFileStore, DEFAULT_DATA_PATH};
pub use store::{InMemoryStore, LocationStore};

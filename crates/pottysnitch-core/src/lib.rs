//! # Pottysnitch Core
//!
//! Core types for the pottysnitch location service.
//!
//! This crate provides the foundational pieces shared by the store, the server and the CLI:
//! - The submitted location record and its parts
//! - The unified error type
//! - The single validation entry point used when strict checking is enabled

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod location;

pub use error::{Error, Result};
pub use location::{
    validate, Coordinate, LocationSubmission, SubmissionMetadata, SubmissionStatus,
};

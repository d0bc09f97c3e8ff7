//! Storage trait and the in-memory backend.

use async_trait::async_trait;
use pottysnitch_core::{LocationSubmission, Result};

/// Trait for location storage backends.
///
/// Records are kept in insertion order and are never updated or removed.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Returns every stored submission in insertion order.
    ///
    /// An empty or not-yet-created store yields an empty list.
    async fn read_all(&self) -> Result<Vec<LocationSubmission>>;

    /// Appends a submission and returns the number of stored records afterwards.
    async fn append(&self, submission: LocationSubmission) -> Result<usize>;

    /// Returns the number of stored submissions.
    async fn count(&self) -> Result<usize> {
        Ok(self.read_all().await?.len())
    }

    /// Short description of the backend for logs and status output.
    fn describe(&self) -> String;
}

/// In-memory location store (for development/testing).
pub struct InMemoryStore {
    records: parking_lot::RwLock<Vec<LocationSubmission>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: parking_lot::RwLock::new(Vec::new()),
        }
    }

    /// Creates an in-memory store seeded with existing records.
    #[must_use]
    pub fn with_records(records: Vec<LocationSubmission>) -> Self {
        Self {
            records: parking_lot::RwLock::new(records),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationStore for InMemoryStore {
    async fn read_all(&self) -> Result<Vec<LocationSubmission>> {
        Ok(self.records.read().clone())
    }

    async fn append(&self, submission: LocationSubmission) -> Result<usize> {
        let mut records = self.records.write();
        records.push(submission);
        Ok(records.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
